use serde::{Deserialize, Serialize};

use crate::profile::{ActivityLevel, Ethnicity, Sex};

/// Main scoring configuration.
///
/// Every coefficient, break point and cut point lives here. Attributes are
/// scored by ordered band tables (first match wins); flags use a single effect.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   missing_labs: reject
///   screening:
///     logistic: { steepness: 0.08, midpoint: 66 }
///     age:
///       - { range: ">=45", effect: "+0.8 per 1 max 25" }
///   clinical:
///     hba1c:
///       - { range: ">=6.5", effect: "+50", label: "Diabetes range" }
///       - { range: ">=5.7", effect: "+3 then +30 per 1", label: "Prediabetes range" }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// What to do when a clinical request is missing lab values
    pub missing_labs: MissingLabsPolicy,

    /// Rules for the assessment without lab values
    pub screening: ScreeningRules,

    /// Rules for the assessment with a full lab panel
    pub clinical: ClinicalRules,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingLabsPolicy {
    /// Score with the screening rules and report the missing fields
    #[default]
    Fallback,
    /// Refuse to score
    Reject,
}

/// One row of an attribute's band table.
///
/// Range format: "<N", "<=N", ">N", ">=N"
/// Effect format: "+N", "+R per U", "+B then +R per U", optionally followed by "max C"
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Band {
    pub range: String,
    pub effect: String,
    /// Shown next to the value in the factor breakdown (e.g. "Prediabetes range")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Band {
    pub fn new(range: &str, effect: &str) -> Self {
        Self {
            range: range.to_string(),
            effect: effect.to_string(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// `100 / (1 + exp(-steepness * (raw - midpoint)))`
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Logistic {
    pub steepness: f64,
    pub midpoint: f64,
}

/// Lower bounds (percent) of the moderate, high and critical tiers.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierCutPoints {
    pub moderate: f64,
    pub high: f64,
    pub critical: f64,
}

/// Band tables that differ by sex (waist circumference, HDL).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SexSpecific {
    pub male: Vec<Band>,
    pub female: Vec<Band>,
}

impl SexSpecific {
    pub fn for_sex(&self, sex: Sex) -> &[Band] {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ActivityEffects {
    pub sedentary: Option<String>,
    pub light: Option<String>,
    pub moderate: Option<String>,
    pub active: Option<String>,
}

impl ActivityEffects {
    pub fn for_level(&self, level: ActivityLevel) -> Option<&str> {
        match level {
            ActivityLevel::Sedentary => self.sedentary.as_deref(),
            ActivityLevel::Light => self.light.as_deref(),
            ActivityLevel::Moderate => self.moderate.as_deref(),
            ActivityLevel::Active => self.active.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EthnicityEffects {
    pub non_hispanic_white: Option<String>,
    pub non_hispanic_black: Option<String>,
    pub hispanic: Option<String>,
    pub non_hispanic_asian: Option<String>,
    pub other: Option<String>,
}

impl EthnicityEffects {
    pub fn for_ethnicity(&self, ethnicity: Ethnicity) -> Option<&str> {
        match ethnicity {
            Ethnicity::NonHispanicWhite => self.non_hispanic_white.as_deref(),
            Ethnicity::NonHispanicBlack => self.non_hispanic_black.as_deref(),
            Ethnicity::Hispanic => self.hispanic.as_deref(),
            Ethnicity::NonHispanicAsian => self.non_hispanic_asian.as_deref(),
            Ethnicity::Other => self.other.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScreeningRules {
    pub logistic: Logistic,
    pub tiers: TierCutPoints,
    /// Years
    pub age: Vec<Band>,
    /// kg/m²
    pub bmi: Vec<Band>,
    /// Centimetres
    pub waist: SexSpecific,
    pub family_history: Option<String>,
    pub hypertension: Option<String>,
    pub activity: ActivityEffects,
    pub ethnicity: EthnicityEffects,
}

impl Default for ScreeningRules {
    fn default() -> Self {
        Self {
            logistic: Logistic {
                steepness: 0.08,
                midpoint: 66.0,
            },
            tiers: TierCutPoints {
                moderate: 20.0,
                high: 50.0,
                critical: 80.0,
            },
            age: vec![Band::new(">=45", "+0.8 per 1 max 25")],
            bmi: vec![
                // (bmi - 25) * 1.5 plus an extra 2 per unit past 30
                Band::new(">=30", "+7.5 then +3.5 per 1 max 30").with_label("Obese"),
                Band::new(">=25", "+1.5 per 1").with_label("Overweight"),
            ],
            // 40 in and 35 in
            waist: SexSpecific {
                male: vec![Band::new(">101.6", "+12").with_label("Central obesity")],
                female: vec![Band::new(">88.9", "+12").with_label("Central obesity")],
            },
            family_history: Some("+15".to_string()),
            hypertension: Some("+10".to_string()),
            activity: ActivityEffects {
                sedentary: Some("+8".to_string()),
                ..ActivityEffects::default()
            },
            ethnicity: EthnicityEffects {
                non_hispanic_white: None,
                non_hispanic_black: Some("+10".to_string()),
                hispanic: Some("+8".to_string()),
                non_hispanic_asian: Some("+6".to_string()),
                other: Some("+5".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClinicalRules {
    pub logistic: Logistic,
    pub tiers: TierCutPoints,
    /// Percent
    pub hba1c: Vec<Band>,
    /// mg/dL
    pub fasting_glucose: Vec<Band>,
    /// kg/m²
    pub bmi: Vec<Band>,
    /// mg/dL
    pub triglycerides: Vec<Band>,
    /// mg/dL, lower is worse
    pub hdl: SexSpecific,
    /// mmHg
    pub systolic_bp: Vec<Band>,
    /// Years
    pub age: Vec<Band>,
    pub family_history: Option<String>,
}

impl Default for ClinicalRules {
    fn default() -> Self {
        Self {
            logistic: Logistic {
                steepness: 0.09,
                midpoint: 110.0,
            },
            tiers: TierCutPoints {
                moderate: 10.0,
                high: 40.0,
                critical: 80.0,
            },
            hba1c: vec![
                Band::new(">=6.5", "+50").with_label("Diabetes range"),
                Band::new(">=5.7", "+3 then +30 per 1").with_label("Prediabetes range"),
                Band::new(">5.4", "+10 per 1").with_label("Elevated"),
            ],
            fasting_glucose: vec![
                Band::new(">=126", "+45").with_label("Diabetes range"),
                Band::new(">=100", "+5 then +1.5 per 1").with_label("Prediabetes range"),
                Band::new(">90", "+0.5 per 1").with_label("Elevated"),
            ],
            bmi: vec![
                Band::new(">=30", "+10 then +1.2 per 1 max 20").with_label("Obese"),
                Band::new(">=25", "+0.8 per 1").with_label("Overweight"),
            ],
            triglycerides: vec![Band::new(">=150", "+0.03 per 1 max 15").with_label("High")],
            hdl: SexSpecific {
                male: vec![Band::new("<40", "+0.3 per 1").with_label("Low")],
                female: vec![Band::new("<50", "+0.3 per 1").with_label("Low")],
            },
            systolic_bp: vec![
                Band::new(">=140", "+8").with_label("High"),
                Band::new(">=130", "+4").with_label("Elevated"),
            ],
            age: vec![Band::new(">=45", "+0.3 per 1 max 10")],
            family_history: Some("+10".to_string()),
        }
    }
}
