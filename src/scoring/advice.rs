//! Recommendation text and clinical notes attached to a result.

use super::result::{ClinicalNote, NoteSeverity, RiskTier};
use crate::profile::{ActivityLevel, CompleteLabs};

/// Average risk used for the "N times the average" comparison.
pub const POPULATION_AVERAGE_RISK: f64 = 12.0;

pub const HBA1C_DIAGNOSTIC: f64 = 6.5;
pub const HBA1C_PREDIABETES: f64 = 5.7;
pub const GLUCOSE_DIAGNOSTIC: f64 = 126.0;
pub const GLUCOSE_PREDIABETES: f64 = 100.0;
pub const BMI_OVERWEIGHT: f64 = 25.0;
pub const BMI_OBESE: f64 = 30.0;
pub const TRIGLYCERIDES_HIGH: f64 = 200.0;

/// Tier-specific advice followed by lifestyle advice that applies to everyone.
pub fn recommendations(tier: RiskTier, bmi: f64, activity: ActivityLevel) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();

    match tier {
        RiskTier::Critical | RiskTier::High => {
            if tier == RiskTier::Critical {
                recs.push(
                    "Contact a healthcare provider promptly: these results should be confirmed with diagnostic testing"
                        .to_string(),
                );
            }
            recs.push(
                "Schedule a medical appointment immediately for comprehensive diabetes screening"
                    .to_string(),
            );
            recs.push(
                "Get tested: fasting glucose and HbA1c if not done recently".to_string(),
            );
            recs.push(
                "Discuss with your doctor: potential need for medications or interventions"
                    .to_string(),
            );
        }
        RiskTier::Moderate => {
            recs.push(
                "Schedule a medical appointment within the next month for diabetes screening"
                    .to_string(),
            );
            recs.push("Get tested: fasting glucose and HbA1c".to_string());
        }
        RiskTier::Low => {
            recs.push("Continue healthy habits to maintain low risk".to_string());
            recs.push(
                "Screen regularly: get tested every 3 years as recommended for adults".to_string(),
            );
        }
    }

    if bmi >= BMI_OVERWEIGHT {
        recs.push(
            "Weight management: aim for 5-10% weight loss to reduce risk significantly".to_string(),
        );
    }
    if activity == ActivityLevel::Sedentary {
        recs.push(
            "Increase physical activity: aim for 150 minutes of moderate exercise per week"
                .to_string(),
        );
    }
    recs.push(
        "Healthy diet: focus on whole grains, vegetables, lean proteins, and limited processed foods"
            .to_string(),
    );
    recs.push("Avoid tobacco: if you smoke, consider cessation programs".to_string());

    recs
}

/// Notes on lab values that cross diagnostic or warning thresholds.
pub fn clinical_notes(labs: &CompleteLabs, bmi: f64) -> Vec<ClinicalNote> {
    let mut notes = Vec::new();

    if labs.hba1c >= HBA1C_DIAGNOSTIC {
        notes.push(critical(
            "HbA1c >= 6.5% meets diagnostic criteria for diabetes",
        ));
    } else if labs.hba1c >= HBA1C_PREDIABETES {
        notes.push(warning("HbA1c in prediabetes range (5.7-6.4%)"));
    }

    if labs.fasting_glucose >= GLUCOSE_DIAGNOSTIC {
        notes.push(critical(
            "Fasting glucose >= 126 mg/dL meets diagnostic criteria for diabetes",
        ));
    } else if labs.fasting_glucose >= GLUCOSE_PREDIABETES {
        notes.push(warning(
            "Fasting glucose in prediabetes range (100-125 mg/dL)",
        ));
    }

    if bmi >= BMI_OBESE {
        notes.push(warning("BMI indicates obesity (Class I or higher)"));
    }

    if labs.triglycerides >= TRIGLYCERIDES_HIGH {
        notes.push(warning("Triglycerides high (>= 200 mg/dL)"));
    }

    notes
}

fn critical(message: &str) -> ClinicalNote {
    ClinicalNote {
        severity: NoteSeverity::Critical,
        message: message.to_string(),
    }
}

fn warning(message: &str) -> ClinicalNote {
    ClinicalNote {
        severity: NoteSeverity::Warning,
        message: message.to_string(),
    }
}
