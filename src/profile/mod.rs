pub mod types;
pub mod units;
pub mod validation;

pub use types::{
    ActivityLevel, BmiCategory, CompleteLabs, Ethnicity, LabField, LabValues, PatientProfile, Sex,
};
pub use validation::{validate_labs, validate_profile};
