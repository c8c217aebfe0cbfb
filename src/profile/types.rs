use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
        }
    }
}

/// Weekly physical activity.
///
/// Sedentary: <30 min/week, Light: 30-150, Moderate: 150-300, Active: >300.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityLevel::Sedentary => write!(f, "Sedentary"),
            ActivityLevel::Light => write!(f, "Light"),
            ActivityLevel::Moderate => write!(f, "Moderate"),
            ActivityLevel::Active => write!(f, "Active"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Ethnicity {
    NonHispanicWhite,
    NonHispanicBlack,
    Hispanic,
    NonHispanicAsian,
    Other,
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ethnicity::NonHispanicWhite => write!(f, "Non-Hispanic White"),
            Ethnicity::NonHispanicBlack => write!(f, "Non-Hispanic Black"),
            Ethnicity::Hispanic => write!(f, "Hispanic"),
            Ethnicity::NonHispanicAsian => write!(f, "Non-Hispanic Asian"),
            Ethnicity::Other => write!(f, "Other/Mixed"),
        }
    }
}

/// Demographic and anthropometric attributes for one assessment.
///
/// Lengths are centimetres and weights kilograms; see [`super::units`] for
/// imperial conversions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientProfile {
    /// Age in years
    pub age: f64,
    pub sex: Sex,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// Waist circumference, None when not measured
    #[serde(default)]
    pub waist_cm: Option<f64>,
    /// Parent, sibling or child with diabetes
    #[serde(default)]
    pub family_history: bool,
    #[serde(default)]
    pub hypertension: bool,
    pub activity: ActivityLevel,
    #[serde(default)]
    pub ethnicity: Option<Ethnicity>,
}

impl PatientProfile {
    pub fn new(
        age: f64,
        sex: Sex,
        height_cm: f64,
        weight_kg: f64,
        activity: ActivityLevel,
    ) -> Self {
        Self {
            age,
            sex,
            height_cm,
            weight_kg,
            waist_cm: None,
            family_history: false,
            hypertension: false,
            activity,
            ethnicity: None,
        }
    }

    pub fn with_waist_cm(mut self, waist_cm: f64) -> Self {
        self.waist_cm = Some(waist_cm);
        self
    }

    pub fn with_family_history(mut self, family_history: bool) -> Self {
        self.family_history = family_history;
        self
    }

    pub fn with_hypertension(mut self, hypertension: bool) -> Self {
        self.hypertension = hypertension;
        self
    }

    pub fn with_ethnicity(mut self, ethnicity: Ethnicity) -> Self {
        self.ethnicity = Some(ethnicity);
        self
    }

    /// Body mass index, kg/m²
    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm / 100.0;
        self.weight_kg / (height_m * height_m)
    }
}

/// Laboratory results for the clinical assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabValues {
    /// Fasting plasma glucose, mg/dL
    #[serde(default)]
    pub fasting_glucose: Option<f64>,
    /// Glycated hemoglobin, %
    #[serde(default)]
    pub hba1c: Option<f64>,
    /// mg/dL
    #[serde(default)]
    pub triglycerides: Option<f64>,
    /// HDL cholesterol, mg/dL
    #[serde(default)]
    pub hdl: Option<f64>,
    /// mmHg
    #[serde(default)]
    pub systolic_bp: Option<f64>,
}

impl LabValues {
    /// All five values present
    pub fn full(
        fasting_glucose: f64,
        hba1c: f64,
        triglycerides: f64,
        hdl: f64,
        systolic_bp: f64,
    ) -> Self {
        Self {
            fasting_glucose: Some(fasting_glucose),
            hba1c: Some(hba1c),
            triglycerides: Some(triglycerides),
            hdl: Some(hdl),
            systolic_bp: Some(systolic_bp),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Fields that are set, with their values.
    pub fn present(&self) -> impl Iterator<Item = (LabField, f64)> + '_ {
        LabField::ALL
            .iter()
            .filter_map(|field| self.get(*field).map(|v| (*field, v)))
    }

    pub fn get(&self, field: LabField) -> Option<f64> {
        match field {
            LabField::FastingGlucose => self.fasting_glucose,
            LabField::Hba1c => self.hba1c,
            LabField::Triglycerides => self.triglycerides,
            LabField::Hdl => self.hdl,
            LabField::SystolicBp => self.systolic_bp,
        }
    }

    /// Returns the full lab panel, or the fields that are missing.
    pub fn complete(&self) -> Result<CompleteLabs, Vec<LabField>> {
        match (
            self.fasting_glucose,
            self.hba1c,
            self.triglycerides,
            self.hdl,
            self.systolic_bp,
        ) {
            (
                Some(fasting_glucose),
                Some(hba1c),
                Some(triglycerides),
                Some(hdl),
                Some(systolic_bp),
            ) => Ok(CompleteLabs {
                fasting_glucose,
                hba1c,
                triglycerides,
                hdl,
                systolic_bp,
            }),
            _ => Err(LabField::ALL
                .iter()
                .copied()
                .filter(|field| self.get(*field).is_none())
                .collect()),
        }
    }
}

/// A lab panel with every value present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompleteLabs {
    pub fasting_glucose: f64,
    pub hba1c: f64,
    pub triglycerides: f64,
    pub hdl: f64,
    pub systolic_bp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabField {
    FastingGlucose,
    Hba1c,
    Triglycerides,
    Hdl,
    SystolicBp,
}

impl LabField {
    pub const ALL: [LabField; 5] = [
        LabField::FastingGlucose,
        LabField::Hba1c,
        LabField::Triglycerides,
        LabField::Hdl,
        LabField::SystolicBp,
    ];

    /// Field name as it appears in input files
    pub fn key(&self) -> &'static str {
        match self {
            LabField::FastingGlucose => "fasting_glucose",
            LabField::Hba1c => "hba1c",
            LabField::Triglycerides => "triglycerides",
            LabField::Hdl => "hdl",
            LabField::SystolicBp => "systolic_bp",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            LabField::Hba1c => "%",
            LabField::SystolicBp => "mmHg",
            _ => "mg/dL",
        }
    }
}

impl fmt::Display for LabField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabField::FastingGlucose => write!(f, "fasting glucose"),
            LabField::Hba1c => write!(f, "HbA1c"),
            LabField::Triglycerides => write!(f, "triglycerides"),
            LabField::Hdl => write!(f, "HDL cholesterol"),
            LabField::SystolicBp => write!(f, "systolic blood pressure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmiCategory::Underweight => write!(f, "Underweight"),
            BmiCategory::Normal => write!(f, "Normal weight"),
            BmiCategory::Overweight => write!(f, "Overweight"),
            BmiCategory::Obese => write!(f, "Obese"),
        }
    }
}
