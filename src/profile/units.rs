//! Imperial to metric conversions for profile input.

pub const CM_PER_INCH: f64 = 2.54;
pub const KG_PER_POUND: f64 = 0.453_592_37;

pub fn inches_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

pub fn feet_inches_to_cm(feet: f64, inches: f64) -> f64 {
    inches_to_cm(feet * 12.0 + inches)
}

pub fn pounds_to_kg(pounds: f64) -> f64 {
    pounds * KG_PER_POUND
}

pub fn cm_to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

pub fn kg_to_pounds(kg: f64) -> f64 {
    kg / KG_PER_POUND
}
