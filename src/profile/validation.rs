use super::types::{LabField, LabValues, PatientProfile};

pub const AGE_RANGE: (f64, f64) = (0.0, 120.0);
pub const HEIGHT_CM_RANGE: (f64, f64) = (100.0, 250.0);
pub const WEIGHT_KG_RANGE: (f64, f64) = (25.0, 350.0);
pub const WAIST_CM_RANGE: (f64, f64) = (40.0, 250.0);

/// Accepted range for each lab value, in the field's own unit.
pub fn lab_range(field: LabField) -> (f64, f64) {
    match field {
        LabField::FastingGlucose => (50.0, 400.0),
        LabField::Hba1c => (3.0, 15.0),
        LabField::Triglycerides => (20.0, 1000.0),
        LabField::Hdl => (10.0, 150.0),
        LabField::SystolicBp => (70.0, 250.0),
    }
}

/// Check a profile against physiological ranges.
/// Returns all validation errors at once (not just the first).
pub fn validate_profile(profile: &PatientProfile) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    check_range(&mut errors, "profile.age", profile.age, AGE_RANGE);
    check_range(&mut errors, "profile.height_cm", profile.height_cm, HEIGHT_CM_RANGE);
    check_range(&mut errors, "profile.weight_kg", profile.weight_kg, WEIGHT_KG_RANGE);
    if let Some(waist) = profile.waist_cm {
        check_range(&mut errors, "profile.waist_cm", waist, WAIST_CM_RANGE);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check every lab value that is present. Missing values are not an error here.
pub fn validate_labs(labs: &LabValues) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (field, value) in labs.present() {
        check_range(
            &mut errors,
            &format!("labs.{}", field.key()),
            value,
            lab_range(field),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_range(errors: &mut Vec<String>, path: &str, value: f64, (min, max): (f64, f64)) {
    if !value.is_finite() {
        errors.push(format!("{}: must be a finite number", path));
    } else if value < min || value > max {
        errors.push(format!(
            "{}: {} is outside the accepted range {}-{}",
            path, value, min, max
        ));
    }
}
