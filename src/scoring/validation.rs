use super::config::{ActivityEffects, Band, Logistic, ScoringConfig, SexSpecific, TierCutPoints};
use super::factors::{Direction, Effect, RangeOp};

/// Slack for floating point noise when comparing band boundaries.
const EPSILON: f64 = 1e-9;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
///
/// Beyond syntax, this rejects any table that could make the score drop when
/// a single risk-increasing input goes up.
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let screening = &config.screening;
    validate_logistic("scoring.screening.logistic", &screening.logistic, &mut errors);
    validate_tiers("scoring.screening.tiers", &screening.tiers, &mut errors);
    validate_bands("scoring.screening.age", &screening.age, &mut errors);
    validate_bands("scoring.screening.bmi", &screening.bmi, &mut errors);
    validate_sex_specific("scoring.screening.waist", &screening.waist, &mut errors);
    validate_flag(
        "scoring.screening.family_history",
        screening.family_history.as_deref(),
        &mut errors,
    );
    validate_flag(
        "scoring.screening.hypertension",
        screening.hypertension.as_deref(),
        &mut errors,
    );
    validate_activity("scoring.screening.activity", &screening.activity, &mut errors);

    let ethnicity = &screening.ethnicity;
    for (key, effect) in [
        ("non_hispanic_white", &ethnicity.non_hispanic_white),
        ("non_hispanic_black", &ethnicity.non_hispanic_black),
        ("hispanic", &ethnicity.hispanic),
        ("non_hispanic_asian", &ethnicity.non_hispanic_asian),
        ("other", &ethnicity.other),
    ] {
        validate_flag(
            &format!("scoring.screening.ethnicity.{}", key),
            effect.as_deref(),
            &mut errors,
        );
    }

    let clinical = &config.clinical;
    validate_logistic("scoring.clinical.logistic", &clinical.logistic, &mut errors);
    validate_tiers("scoring.clinical.tiers", &clinical.tiers, &mut errors);
    validate_bands("scoring.clinical.hba1c", &clinical.hba1c, &mut errors);
    validate_bands(
        "scoring.clinical.fasting_glucose",
        &clinical.fasting_glucose,
        &mut errors,
    );
    validate_bands("scoring.clinical.bmi", &clinical.bmi, &mut errors);
    validate_bands(
        "scoring.clinical.triglycerides",
        &clinical.triglycerides,
        &mut errors,
    );
    validate_sex_specific("scoring.clinical.hdl", &clinical.hdl, &mut errors);
    validate_bands("scoring.clinical.systolic_bp", &clinical.systolic_bp, &mut errors);
    validate_bands("scoring.clinical.age", &clinical.age, &mut errors);
    validate_flag(
        "scoring.clinical.family_history",
        clinical.family_history.as_deref(),
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_logistic(path: &str, logistic: &Logistic, errors: &mut Vec<String>) {
    if !(logistic.steepness.is_finite() && logistic.steepness > 0.0) {
        errors.push(format!("{}.steepness: must be a positive number", path));
    }
    if !logistic.midpoint.is_finite() {
        errors.push(format!("{}.midpoint: must be a finite number", path));
    }
}

fn validate_tiers(path: &str, tiers: &TierCutPoints, errors: &mut Vec<String>) {
    let points = [tiers.moderate, tiers.high, tiers.critical];
    let in_bounds = points.iter().all(|p| p.is_finite() && *p > 0.0 && *p < 100.0);
    let increasing = points.windows(2).all(|w| w[0] < w[1]);
    if !(in_bounds && increasing) {
        errors.push(format!(
            "{}: cut points must satisfy 0 < moderate < high < critical < 100 (got {}, {}, {})",
            path, tiers.moderate, tiers.high, tiers.critical
        ));
    }
}

fn validate_sex_specific(path: &str, tables: &SexSpecific, errors: &mut Vec<String>) {
    validate_bands(&format!("{}.male", path), &tables.male, errors);
    validate_bands(&format!("{}.female", path), &tables.female, errors);
}

fn validate_bands(path: &str, bands: &[Band], errors: &mut Vec<String>) {
    let mut parsed = Vec::with_capacity(bands.len());

    for (i, band) in bands.iter().enumerate() {
        let range = match RangeOp::parse(&band.range) {
            Ok(range) => Some(range),
            Err(e) => {
                errors.push(format!(
                    "{}[{}].range: invalid '{}' - {}",
                    path, i, band.range, e
                ));
                None
            }
        };
        let effect = match Effect::parse(&band.effect) {
            Ok(effect) if !effect.is_non_negative() => {
                errors.push(format!(
                    "{}[{}].effect: '{}' must not subtract points",
                    path, i, band.effect
                ));
                None
            }
            Ok(effect) => Some(effect),
            Err(e) => {
                errors.push(format!(
                    "{}[{}].effect: invalid '{}' - {}",
                    path, i, band.effect, e
                ));
                None
            }
        };
        if let (Some(range), Some(effect)) = (range, effect) {
            parsed.push((i, range, effect));
        }
    }

    // Ordering checks only make sense once every row parsed
    if parsed.len() != bands.len() || parsed.is_empty() {
        return;
    }

    let direction = parsed[0].1.direction();
    if parsed.iter().any(|(_, range, _)| range.direction() != direction) {
        errors.push(format!(
            "{}: bands must all use '>' ranges or all use '<' ranges",
            path
        ));
        return;
    }

    for pair in parsed.windows(2) {
        let (upper_i, upper_range, upper_effect) = &pair[0];
        let (lower_i, lower_range, lower_effect) = &pair[1];

        let ordered = match direction {
            Direction::Rising => upper_range.bound() > lower_range.bound(),
            Direction::Falling => upper_range.bound() < lower_range.bound(),
        };
        if !ordered {
            errors.push(format!(
                "{}[{}].range: '{}' must be listed before '{}' (highest-risk band first)",
                path, lower_i, bands[*lower_i].range, bands[*upper_i].range
            ));
            continue;
        }

        let boundary = upper_range.bound();
        let reached = lower_effect.apply(lower_range.excess(boundary));
        let starts_at = upper_effect.apply(0.0);
        if reached > starts_at + EPSILON {
            errors.push(format!(
                "{}[{}].effect: reaches {:.2} at {} but band [{}] starts at {:.2}, so the score would drop",
                path, lower_i, reached, boundary, upper_i, starts_at
            ));
        }
    }
}

/// Flags take a single flat, non-negative amount.
fn flat_points(path: &str, effect: Option<&str>, errors: &mut Vec<String>) -> Option<f64> {
    let effect_str = effect?;
    match Effect::parse(effect_str) {
        Ok(Effect::Add(n)) if n >= 0.0 => Some(n),
        Ok(Effect::Add(_)) => {
            errors.push(format!("{}: '{}' must not subtract points", path, effect_str));
            None
        }
        Ok(Effect::AddPerUnit { .. }) => {
            errors.push(format!(
                "{}: '{}' must be a flat '+N' amount",
                path, effect_str
            ));
            None
        }
        Err(e) => {
            errors.push(format!("{}: invalid '{}' - {}", path, effect_str, e));
            None
        }
    }
}

fn validate_flag(path: &str, effect: Option<&str>, errors: &mut Vec<String>) {
    flat_points(path, effect, errors);
}

fn validate_activity(path: &str, activity: &ActivityEffects, errors: &mut Vec<String>) {
    let levels = [
        ("sedentary", activity.sedentary.as_deref()),
        ("light", activity.light.as_deref()),
        ("moderate", activity.moderate.as_deref()),
        ("active", activity.active.as_deref()),
    ];

    let before = errors.len();
    let points: Vec<f64> = levels
        .iter()
        .map(|(key, effect)| {
            flat_points(&format!("{}.{}", path, key), *effect, errors).unwrap_or(0.0)
        })
        .collect();
    if errors.len() != before {
        return;
    }

    for (i, pair) in points.windows(2).enumerate() {
        if pair[1] > pair[0] {
            errors.push(format!(
                "{}.{}: more activity must not add more points than '{}'",
                path,
                levels[i + 1].0,
                levels[i].0
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_scoring(&ScoringConfig::default()), Ok(()));
    }

    #[test]
    fn test_invalid_range_format() {
        let mut config = ScoringConfig::default();
        config.clinical.hba1c[0].range = "6.5".to_string();
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.clinical.hba1c[0].range"));
    }

    #[test]
    fn test_invalid_effect_format() {
        let mut config = ScoringConfig::default();
        config.screening.bmi[1].effect = "x2".to_string();
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.screening.bmi[1].effect"));
    }

    #[test]
    fn test_negative_band_effect() {
        let mut config = ScoringConfig::default();
        config.screening.age = vec![Band::new(">=45", "+-1 per 1")];
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("must not subtract points"));
    }

    #[test]
    fn test_bands_out_of_order() {
        let mut config = ScoringConfig::default();
        config.clinical.systolic_bp = vec![Band::new(">=130", "+4"), Band::new(">=140", "+8")];
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.clinical.systolic_bp[1].range"));
        assert!(errors[0].contains("highest-risk band first"));
    }

    #[test]
    fn test_score_drop_at_boundary() {
        // A prediabetes band starting at zero gives 2.9 points at 5.69 and 0 at 5.7
        let mut config = ScoringConfig::default();
        config.clinical.hba1c = vec![
            Band::new(">=6.5", "+50"),
            Band::new(">=5.7", "+30 per 1"),
            Band::new(">5.4", "+10 per 1"),
        ];
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.clinical.hba1c[2].effect"));
        assert!(errors[0].contains("score would drop"));
    }

    #[test]
    fn test_capped_band_below_flat_band_is_fine() {
        let mut config = ScoringConfig::default();
        config.clinical.fasting_glucose = vec![
            Band::new(">=126", "+45"),
            Band::new(">=100", "+1.5 per 1 max 40"),
        ];
        assert!(validate_scoring(&config).is_ok());
    }

    #[test]
    fn test_falling_bands_ordering() {
        let mut config = ScoringConfig::default();
        config.clinical.hdl.male = vec![
            Band::new("<30", "+6"),
            Band::new("<40", "+0.3 per 1"),
        ];
        assert!(validate_scoring(&config).is_ok());

        config.clinical.hdl.male = vec![
            Band::new("<40", "+0.3 per 1"),
            Band::new("<30", "+6"),
        ];
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.clinical.hdl.male[1].range"));
    }

    #[test]
    fn test_mixed_directions() {
        let mut config = ScoringConfig::default();
        config.clinical.triglycerides = vec![Band::new(">=150", "+5"), Band::new("<40", "+1")];
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("all use '>' ranges"));
    }

    #[test]
    fn test_flag_must_be_flat() {
        let mut config = ScoringConfig::default();
        config.screening.family_history = Some("+1 per 1".to_string());
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.screening.family_history"));
    }

    #[test]
    fn test_activity_must_decrease() {
        let mut config = ScoringConfig::default();
        config.screening.activity.active = Some("+3".to_string());
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("scoring.screening.activity.active"));
    }

    #[test]
    fn test_bad_logistic_and_tiers() {
        let mut config = ScoringConfig::default();
        config.clinical.logistic.steepness = 0.0;
        config.screening.tiers = TierCutPoints {
            moderate: 50.0,
            high: 20.0,
            critical: 80.0,
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("scoring.screening.tiers")));
        assert!(errors.iter().any(|e| e.contains("scoring.clinical.logistic.steepness")));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ScoringConfig::default();
        config.screening.hypertension = Some("bad".to_string()); // Error 1
        config.clinical.age = vec![Band::new("45", "+1")]; // Error 2
        config.screening.ethnicity.hispanic = Some("+-8".to_string()); // Error 3
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
