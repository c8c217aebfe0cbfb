use serde::{Deserialize, Serialize};
use std::fmt;

use super::advice::POPULATION_AVERAGE_RISK;
use super::config::TierCutPoints;
use crate::profile::{BmiCategory, LabField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    /// Demographics and body measurements only
    Screening,
    /// Full laboratory panel
    Clinical,
}

impl AssessmentKind {
    pub fn confidence(&self) -> &'static str {
        match self {
            AssessmentKind::Screening => "Moderate (screening tool)",
            AssessmentKind::Clinical => "High (laboratory values)",
        }
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentKind::Screening => write!(f, "Screening"),
            AssessmentKind::Clinical => write!(f, "Clinical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskTier {
    pub fn classify(percentage: f64, cut_points: &TierCutPoints) -> Self {
        if percentage < cut_points.moderate {
            RiskTier::Low
        } else if percentage < cut_points.high {
            RiskTier::Moderate
        } else if percentage < cut_points.critical {
            RiskTier::High
        } else {
            RiskTier::Critical
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Moderate => write!(f, "MODERATE"),
            RiskTier::High => write!(f, "HIGH"),
            RiskTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Attribute a contribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Age,
    Bmi,
    WaistCircumference,
    FamilyHistory,
    Hypertension,
    PhysicalActivity,
    Ethnicity,
    Hba1c,
    FastingGlucose,
    Triglycerides,
    HdlCholesterol,
    BloodPressure,
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactorKind::Age => "Age",
            FactorKind::Bmi => "BMI",
            FactorKind::WaistCircumference => "Waist Circumference",
            FactorKind::FamilyHistory => "Family History",
            FactorKind::Hypertension => "High Blood Pressure",
            FactorKind::PhysicalActivity => "Physical Activity",
            FactorKind::Ethnicity => "Race/Ethnicity",
            FactorKind::Hba1c => "HbA1c",
            FactorKind::FastingGlucose => "Fasting Glucose",
            FactorKind::Triglycerides => "Triglycerides",
            FactorKind::HdlCholesterol => "HDL Cholesterol",
            FactorKind::BloodPressure => "Blood Pressure",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: FactorKind,
    /// Points added to the raw score
    pub contribution: f64,
    /// The input as shown to the user, e.g. "7.2% (Diabetes range)"
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSeverity {
    Warning,
    /// A diagnostic threshold was crossed
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub severity: NoteSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub assessment: AssessmentKind,
    /// Estimated risk, 0-100
    pub percentage: f64,
    /// Sum of contributions before the logistic transform
    pub raw_score: f64,
    pub tier: RiskTier,
    /// Nonzero contributions, largest first
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub clinical_notes: Vec<ClinicalNote>,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    /// Lab fields that were missing when a clinical request fell back to screening
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_labs: Vec<LabField>,
}

impl RiskResult {
    /// True when labs were supplied but incomplete, so screening rules were used.
    pub fn is_degraded(&self) -> bool {
        !self.missing_labs.is_empty()
    }

    pub fn top_factors(&self, n: usize) -> &[RiskFactor] {
        &self.factors[..n.min(self.factors.len())]
    }

    /// Risk as a multiple of the population average.
    pub fn relative_to_average(&self) -> f64 {
        self.percentage / POPULATION_AVERAGE_RISK
    }

    pub fn has_critical_note(&self) -> bool {
        self.clinical_notes
            .iter()
            .any(|n| n.severity == NoteSeverity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut_points() -> TierCutPoints {
        TierCutPoints {
            moderate: 20.0,
            high: 50.0,
            critical: 80.0,
        }
    }

    #[test]
    fn test_classify_boundaries() {
        let cuts = cut_points();
        assert_eq!(RiskTier::classify(0.0, &cuts), RiskTier::Low);
        assert_eq!(RiskTier::classify(19.99, &cuts), RiskTier::Low);
        assert_eq!(RiskTier::classify(20.0, &cuts), RiskTier::Moderate);
        assert_eq!(RiskTier::classify(50.0, &cuts), RiskTier::High);
        assert_eq!(RiskTier::classify(79.9, &cuts), RiskTier::High);
        assert_eq!(RiskTier::classify(80.0, &cuts), RiskTier::Critical);
        assert_eq!(RiskTier::classify(100.0, &cuts), RiskTier::Critical);
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(RiskTier::Low < RiskTier::Moderate);
        assert!(RiskTier::High < RiskTier::Critical);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(RiskTier::Critical.to_string(), "CRITICAL");
        assert_eq!(FactorKind::Hypertension.to_string(), "High Blood Pressure");
        assert_eq!(FactorKind::Ethnicity.to_string(), "Race/Ethnicity");
    }
}
