use anyhow::{bail, Result};
use std::cmp::Ordering;
use tracing::{debug, warn};

use super::advice;
use super::config::{
    ActivityEffects, ClinicalRules, EthnicityEffects, Logistic, MissingLabsPolicy,
    ScoringConfig, ScreeningRules, SexSpecific, TierCutPoints,
};
use super::factors::{BandTable, Effect};
use super::result::{AssessmentKind, ClinicalNote, FactorKind, RiskFactor, RiskResult, RiskTier};
use super::validation::validate_scoring;
use crate::error::AssessmentError;
use crate::profile::{
    validate_labs, validate_profile, ActivityLevel, BmiCategory, CompleteLabs, Ethnicity,
    LabField, LabValues, PatientProfile, Sex,
};

/// Map a raw score onto 0-100 with the logistic curve.
pub fn logistic_percent(raw_score: f64, logistic: &Logistic) -> f64 {
    let percentage = 100.0 / (1.0 + (-logistic.steepness * (raw_score - logistic.midpoint)).exp());
    percentage.clamp(0.0, 100.0)
}

#[derive(Debug, Clone)]
struct SexTables {
    male: BandTable,
    female: BandTable,
}

impl SexTables {
    fn compile(tables: &SexSpecific) -> Result<Self> {
        Ok(Self {
            male: BandTable::compile(&tables.male)?,
            female: BandTable::compile(&tables.female)?,
        })
    }

    fn for_sex(&self, sex: Sex) -> &BandTable {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

#[derive(Debug, Clone)]
struct ScreeningModel {
    logistic: Logistic,
    tiers: TierCutPoints,
    age: BandTable,
    bmi: BandTable,
    waist: SexTables,
    family_history: f64,
    hypertension: f64,
    activity: Vec<(ActivityLevel, f64)>,
    ethnicity: Vec<(Ethnicity, f64)>,
}

impl ScreeningModel {
    fn compile(rules: &ScreeningRules) -> Result<Self> {
        Ok(Self {
            logistic: rules.logistic,
            tiers: rules.tiers,
            age: BandTable::compile(&rules.age)?,
            bmi: BandTable::compile(&rules.bmi)?,
            waist: SexTables::compile(&rules.waist)?,
            family_history: flat_points(rules.family_history.as_deref())?,
            hypertension: flat_points(rules.hypertension.as_deref())?,
            activity: compile_activity(&rules.activity)?,
            ethnicity: compile_ethnicity(&rules.ethnicity)?,
        })
    }
}

#[derive(Debug, Clone)]
struct ClinicalModel {
    logistic: Logistic,
    tiers: TierCutPoints,
    hba1c: BandTable,
    fasting_glucose: BandTable,
    bmi: BandTable,
    triglycerides: BandTable,
    hdl: SexTables,
    systolic_bp: BandTable,
    age: BandTable,
    family_history: f64,
}

impl ClinicalModel {
    fn compile(rules: &ClinicalRules) -> Result<Self> {
        Ok(Self {
            logistic: rules.logistic,
            tiers: rules.tiers,
            hba1c: BandTable::compile(&rules.hba1c)?,
            fasting_glucose: BandTable::compile(&rules.fasting_glucose)?,
            bmi: BandTable::compile(&rules.bmi)?,
            triglycerides: BandTable::compile(&rules.triglycerides)?,
            hdl: SexTables::compile(&rules.hdl)?,
            systolic_bp: BandTable::compile(&rules.systolic_bp)?,
            age: BandTable::compile(&rules.age)?,
            family_history: flat_points(rules.family_history.as_deref())?,
        })
    }
}

fn flat_points(effect: Option<&str>) -> Result<f64> {
    match effect {
        None => Ok(0.0),
        Some(s) => match Effect::parse(s)? {
            Effect::Add(n) => Ok(n),
            Effect::AddPerUnit { .. } => bail!("'{}' must be a flat '+N' amount", s),
        },
    }
}

fn compile_activity(effects: &ActivityEffects) -> Result<Vec<(ActivityLevel, f64)>> {
    [
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
    ]
    .into_iter()
    .map(|level| Ok((level, flat_points(effects.for_level(level))?)))
    .collect()
}

fn compile_ethnicity(effects: &EthnicityEffects) -> Result<Vec<(Ethnicity, f64)>> {
    [
        Ethnicity::NonHispanicWhite,
        Ethnicity::NonHispanicBlack,
        Ethnicity::Hispanic,
        Ethnicity::NonHispanicAsian,
        Ethnicity::Other,
    ]
    .into_iter()
    .map(|ethnicity| Ok((ethnicity, flat_points(effects.for_ethnicity(ethnicity))?)))
    .collect()
}

fn lookup<K: PartialEq>(table: &[(K, f64)], key: K) -> f64 {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(0.0, |(_, points)| *points)
}

/// Running list of contributions for one assessment.
#[derive(Default)]
struct Tally {
    factors: Vec<RiskFactor>,
}

impl Tally {
    fn add(&mut self, factor: FactorKind, points: f64, detail: String) {
        if points > 0.0 {
            debug!(factor = %factor, points, detail = %detail, "risk factor applied");
            self.factors.push(RiskFactor {
                factor,
                contribution: points,
                detail,
            });
        }
    }

    fn band(&mut self, factor: FactorKind, table: &BandTable, value: f64, shown: String) {
        if let Some(hit) = table.evaluate(value) {
            let detail = match hit.label {
                Some(label) => format!("{} ({})", shown, label),
                None => shown,
            };
            self.add(factor, hit.points, detail);
        }
    }

    /// Raw score and the factors, largest contribution first.
    fn finish(mut self) -> (f64, Vec<RiskFactor>) {
        let raw_score: f64 = self.factors.iter().map(|f| f.contribution).sum();
        self.factors.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        });
        (raw_score, self.factors)
    }
}

/// Validated, pre-parsed scoring rules.
///
/// Build once with [`RiskScorer::new`], then call [`RiskScorer::score`] per
/// assessment. Scoring is a pure function of the inputs.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    missing_labs: MissingLabsPolicy,
    screening: ScreeningModel,
    clinical: ClinicalModel,
}

impl RiskScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self, AssessmentError> {
        validate_scoring(config).map_err(AssessmentError::InvalidScoring)?;

        let compiled = ScreeningModel::compile(&config.screening).and_then(|screening| {
            Ok((screening, ClinicalModel::compile(&config.clinical)?))
        });
        let (screening, clinical) =
            compiled.map_err(|e| AssessmentError::InvalidScoring(vec![format!("{:#}", e)]))?;

        Ok(Self {
            missing_labs: config.missing_labs,
            screening,
            clinical,
        })
    }

    pub fn missing_labs_policy(&self) -> MissingLabsPolicy {
        self.missing_labs
    }

    /// Score a profile, with the clinical rules when a full lab panel is given.
    ///
    /// `labs` that are `None` or empty select the screening rules. A partial
    /// panel follows the missing-labs policy: fall back to screening (the
    /// result lists what was missing) or reject.
    pub fn score(
        &self,
        profile: &PatientProfile,
        labs: Option<&LabValues>,
    ) -> Result<RiskResult, AssessmentError> {
        let mut errors = Vec::new();
        if let Err(e) = validate_profile(profile) {
            errors.extend(e);
        }
        if let Some(labs) = labs {
            if let Err(e) = validate_labs(labs) {
                errors.extend(e);
            }
        }
        if !errors.is_empty() {
            return Err(AssessmentError::InvalidInput(errors));
        }

        match labs.filter(|l| !l.is_empty()) {
            None => Ok(self.score_screening(profile, Vec::new())),
            Some(labs) => match labs.complete() {
                Ok(complete) => Ok(self.score_clinical(profile, &complete)),
                Err(missing) => match self.missing_labs {
                    MissingLabsPolicy::Reject => Err(AssessmentError::IncompleteLabs(missing)),
                    MissingLabsPolicy::Fallback => {
                        warn!(
                            missing = ?missing.iter().map(|f| f.key()).collect::<Vec<_>>(),
                            "incomplete lab panel, using screening rules"
                        );
                        Ok(self.score_screening(profile, missing))
                    }
                },
            },
        }
    }

    fn score_screening(&self, profile: &PatientProfile, missing_labs: Vec<LabField>) -> RiskResult {
        let model = &self.screening;
        let bmi = profile.bmi();
        let mut tally = Tally::default();

        tally.band(FactorKind::Age, &model.age, profile.age, format!("{} years", profile.age));
        tally.band(FactorKind::Bmi, &model.bmi, bmi, format!("{:.1} kg/m²", bmi));
        if let Some(waist) = profile.waist_cm {
            tally.band(
                FactorKind::WaistCircumference,
                model.waist.for_sex(profile.sex),
                waist,
                format!("{:.1} cm", waist),
            );
        }
        if profile.family_history {
            tally.add(FactorKind::FamilyHistory, model.family_history, "Positive".to_string());
        }
        if profile.hypertension {
            tally.add(FactorKind::Hypertension, model.hypertension, "Positive".to_string());
        }
        tally.add(
            FactorKind::PhysicalActivity,
            lookup(&model.activity, profile.activity),
            profile.activity.to_string(),
        );
        if let Some(ethnicity) = profile.ethnicity {
            tally.add(
                FactorKind::Ethnicity,
                lookup(&model.ethnicity, ethnicity),
                ethnicity.to_string(),
            );
        }

        build_result(
            AssessmentKind::Screening,
            tally,
            &model.logistic,
            &model.tiers,
            profile,
            Vec::new(),
            missing_labs,
        )
    }

    fn score_clinical(&self, profile: &PatientProfile, labs: &CompleteLabs) -> RiskResult {
        let model = &self.clinical;
        let bmi = profile.bmi();
        let mut tally = Tally::default();

        tally.band(FactorKind::Hba1c, &model.hba1c, labs.hba1c, format!("{}%", labs.hba1c));
        tally.band(
            FactorKind::FastingGlucose,
            &model.fasting_glucose,
            labs.fasting_glucose,
            format!("{} mg/dL", labs.fasting_glucose),
        );
        tally.band(FactorKind::Bmi, &model.bmi, bmi, format!("{:.1} kg/m²", bmi));
        tally.band(
            FactorKind::Triglycerides,
            &model.triglycerides,
            labs.triglycerides,
            format!("{} mg/dL", labs.triglycerides),
        );
        tally.band(
            FactorKind::HdlCholesterol,
            model.hdl.for_sex(profile.sex),
            labs.hdl,
            format!("{} mg/dL", labs.hdl),
        );
        tally.band(
            FactorKind::BloodPressure,
            &model.systolic_bp,
            labs.systolic_bp,
            format!("{} mmHg", labs.systolic_bp),
        );
        tally.band(FactorKind::Age, &model.age, profile.age, format!("{} years", profile.age));
        if profile.family_history {
            tally.add(FactorKind::FamilyHistory, model.family_history, "Positive".to_string());
        }

        build_result(
            AssessmentKind::Clinical,
            tally,
            &model.logistic,
            &model.tiers,
            profile,
            advice::clinical_notes(labs, bmi),
            Vec::new(),
        )
    }
}

fn build_result(
    assessment: AssessmentKind,
    tally: Tally,
    logistic: &Logistic,
    tiers: &TierCutPoints,
    profile: &PatientProfile,
    clinical_notes: Vec<ClinicalNote>,
    missing_labs: Vec<LabField>,
) -> RiskResult {
    let (raw_score, factors) = tally.finish();
    let percentage = logistic_percent(raw_score, logistic);
    let tier = RiskTier::classify(percentage, tiers);
    let bmi = profile.bmi();

    debug!(%assessment, raw_score, percentage, %tier, "assessment scored");

    RiskResult {
        assessment,
        percentage,
        raw_score,
        tier,
        factors,
        recommendations: advice::recommendations(tier, bmi, profile.activity),
        clinical_notes,
        bmi,
        bmi_category: BmiCategory::from_bmi(bmi),
        missing_labs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::units::{feet_inches_to_cm, inches_to_cm, pounds_to_kg};
    use crate::scoring::{Band, NoteSeverity};

    fn scorer() -> RiskScorer {
        RiskScorer::new(&ScoringConfig::default()).unwrap()
    }

    /// 52-year-old man, 5'10", 220 lb, 42 in waist, family history, hypertension, sedentary.
    fn demo_profile() -> PatientProfile {
        PatientProfile::new(
            52.0,
            Sex::Male,
            feet_inches_to_cm(5.0, 10.0),
            pounds_to_kg(220.0),
            ActivityLevel::Sedentary,
        )
        .with_waist_cm(inches_to_cm(42.0))
        .with_family_history(true)
        .with_hypertension(true)
    }

    fn demo_labs() -> LabValues {
        LabValues::full(142.0, 7.2, 245.0, 35.0, 145.0)
    }

    fn healthy_profile() -> PatientProfile {
        PatientProfile::new(30.0, Sex::Female, 165.0, 58.0, ActivityLevel::Active)
    }

    fn contribution(result: &RiskResult, factor: FactorKind) -> Option<f64> {
        result
            .factors
            .iter()
            .find(|f| f.factor == factor)
            .map(|f| f.contribution)
    }

    #[test]
    fn test_logistic_midpoint_is_fifty() {
        let logistic = Logistic {
            steepness: 0.08,
            midpoint: 40.0,
        };
        assert!((logistic_percent(40.0, &logistic) - 50.0).abs() < 1e-9);
        assert!(logistic_percent(-1e6, &logistic) >= 0.0);
        assert!(logistic_percent(1e6, &logistic) <= 100.0);
    }

    #[test]
    fn test_demo_screening_scenario() {
        let result = scorer().score(&demo_profile(), None).unwrap();

        assert_eq!(result.assessment, AssessmentKind::Screening);
        assert!((result.raw_score - 63.58).abs() < 0.01);
        assert!((result.percentage - 45.2).abs() < 0.1);
        assert_eq!(result.tier, RiskTier::Moderate);
        assert_eq!(result.bmi_category, BmiCategory::Obese);
        assert!(!result.is_degraded());
        assert!(result.clinical_notes.is_empty());
    }

    #[test]
    fn test_demo_screening_factor_breakdown() {
        let result = scorer().score(&demo_profile(), None).unwrap();

        let order: Vec<FactorKind> = result.factors.iter().map(|f| f.factor).collect();
        assert_eq!(
            order,
            vec![
                FactorKind::FamilyHistory,
                FactorKind::Bmi,
                FactorKind::WaistCircumference,
                FactorKind::Hypertension,
                FactorKind::PhysicalActivity,
                FactorKind::Age,
            ]
        );
        assert!((contribution(&result, FactorKind::Age).unwrap() - 5.6).abs() < 1e-9);
        assert_eq!(result.factors[1].detail, "31.6 kg/m² (Obese)");
        assert_eq!(result.factors[4].detail, "Sedentary");
    }

    #[test]
    fn test_demo_clinical_scenario() {
        let result = scorer().score(&demo_profile(), Some(&demo_labs())).unwrap();

        assert_eq!(result.assessment, AssessmentKind::Clinical);
        assert!((result.raw_score - 131.33).abs() < 0.01);
        assert!((result.percentage - 87.2).abs() < 0.1);
        assert_eq!(result.tier, RiskTier::Critical);
        assert!(result.has_critical_note());
        assert_eq!(result.factors[0].factor, FactorKind::Hba1c);
        assert_eq!(result.factors[0].detail, "7.2% (Diabetes range)");
        assert_eq!(result.factors[1].detail, "142 mg/dL (Diabetes range)");
        assert!(result.recommendations[0].starts_with("Contact a healthcare provider"));
    }

    #[test]
    fn test_clinical_ignores_screening_only_factors() {
        let result = scorer().score(&demo_profile(), Some(&demo_labs())).unwrap();
        assert!(contribution(&result, FactorKind::WaistCircumference).is_none());
        assert!(contribution(&result, FactorKind::Hypertension).is_none());
        assert!(contribution(&result, FactorKind::PhysicalActivity).is_none());
    }

    #[test]
    fn test_hdl_threshold_depends_on_sex() {
        let labs = LabValues::full(85.0, 5.0, 100.0, 45.0, 115.0);
        let male = PatientProfile::new(30.0, Sex::Male, 180.0, 70.0, ActivityLevel::Active);
        let female = PatientProfile::new(30.0, Sex::Female, 180.0, 70.0, ActivityLevel::Active);

        let male_result = scorer().score(&male, Some(&labs)).unwrap();
        let female_result = scorer().score(&female, Some(&labs)).unwrap();

        assert!(contribution(&male_result, FactorKind::HdlCholesterol).is_none());
        let hdl = contribution(&female_result, FactorKind::HdlCholesterol).unwrap();
        assert!((hdl - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_waist_threshold_is_strict() {
        let at_threshold = healthy_profile().with_waist_cm(88.9);
        let result = scorer().score(&at_threshold, None).unwrap();
        assert!(contribution(&result, FactorKind::WaistCircumference).is_none());

        let above = healthy_profile().with_waist_cm(89.0);
        let result = scorer().score(&above, None).unwrap();
        assert_eq!(contribution(&result, FactorKind::WaistCircumference), Some(12.0));
    }

    #[test]
    fn test_ethnicity_adjustment() {
        let profile = healthy_profile().with_ethnicity(Ethnicity::NonHispanicBlack);
        let result = scorer().score(&profile, None).unwrap();
        assert_eq!(contribution(&result, FactorKind::Ethnicity), Some(10.0));
        assert_eq!(result.factors[0].detail, "Non-Hispanic Black");

        let profile = healthy_profile().with_ethnicity(Ethnicity::NonHispanicWhite);
        let result = scorer().score(&profile, None).unwrap();
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_healthy_profile_is_low_risk() {
        let result = scorer().score(&healthy_profile(), None).unwrap();
        assert_eq!(result.raw_score, 0.0);
        assert_eq!(result.tier, RiskTier::Low);
        assert!(result.factors.is_empty());
        assert!(result.percentage > 0.0);
    }

    #[test]
    fn test_prediabetes_band_is_continuous() {
        let below = LabValues::full(85.0, 5.69, 100.0, 60.0, 115.0);
        let at = LabValues::full(85.0, 5.7, 100.0, 60.0, 115.0);
        let profile = healthy_profile();

        let below = scorer().score(&profile, Some(&below)).unwrap();
        let at = scorer().score(&profile, Some(&at)).unwrap();
        assert!(at.percentage >= below.percentage);
        assert_eq!(at.factors[0].detail, "5.7% (Prediabetes range)");
        assert_eq!(at.clinical_notes[0].severity, NoteSeverity::Warning);
    }

    #[test]
    fn test_partial_labs_fall_back_to_screening() {
        let labs = LabValues {
            hba1c: Some(7.2),
            ..LabValues::default()
        };
        let scorer = scorer();
        let fallback = scorer.score(&demo_profile(), Some(&labs)).unwrap();
        let screening = scorer.score(&demo_profile(), None).unwrap();

        assert_eq!(fallback.assessment, AssessmentKind::Screening);
        assert!(fallback.is_degraded());
        assert_eq!(fallback.missing_labs.len(), 4);
        assert!(!fallback.missing_labs.contains(&LabField::Hba1c));
        assert_eq!(fallback.percentage, screening.percentage);
    }

    #[test]
    fn test_partial_labs_rejected_when_configured() {
        let config = ScoringConfig {
            missing_labs: MissingLabsPolicy::Reject,
            ..ScoringConfig::default()
        };
        let scorer = RiskScorer::new(&config).unwrap();
        let labs = LabValues {
            fasting_glucose: Some(142.0),
            hba1c: Some(7.2),
            ..LabValues::default()
        };

        match scorer.score(&demo_profile(), Some(&labs)) {
            Err(AssessmentError::IncompleteLabs(missing)) => {
                assert_eq!(
                    missing,
                    vec![LabField::Triglycerides, LabField::Hdl, LabField::SystolicBp]
                );
            }
            other => panic!("expected IncompleteLabs, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_labs_mean_screening() {
        let result = scorer()
            .score(&demo_profile(), Some(&LabValues::default()))
            .unwrap();
        assert_eq!(result.assessment, AssessmentKind::Screening);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_invalid_input_rejected_before_scoring() {
        let mut profile = demo_profile();
        profile.age = -3.0;
        profile.height_cm = 0.0;
        let labs = LabValues {
            hba1c: Some(40.0),
            ..demo_labs()
        };

        match scorer().score(&profile, Some(&labs)) {
            Err(AssessmentError::InvalidInput(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].starts_with("profile.age"));
                assert!(errors[2].starts_with("labs.hba1c"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ScoringConfig::default();
        config.clinical.hba1c = vec![Band::new("6.5", "+50")];
        match RiskScorer::new(&config) {
            Err(AssessmentError::InvalidScoring(errors)) => {
                assert!(errors[0].contains("scoring.clinical.hba1c[0].range"));
            }
            other => panic!("expected InvalidScoring, got {:?}", other),
        }
    }

    #[test]
    fn test_low_midpoints_saturate_demo() {
        // Midpoints 40 and 50 push both demo scenarios near the top of the curve
        let mut config = ScoringConfig::default();
        config.screening.logistic.midpoint = 40.0;
        config.clinical.logistic.midpoint = 50.0;
        let scorer = RiskScorer::new(&config).unwrap();

        let screening = scorer.score(&demo_profile(), None).unwrap();
        assert!((screening.percentage - 86.8).abs() < 0.1);
        assert_eq!(screening.tier, RiskTier::Critical);

        let clinical = scorer.score(&demo_profile(), Some(&demo_labs())).unwrap();
        assert!(clinical.percentage > 99.9);
    }

    #[test]
    fn test_custom_activity_points() {
        let mut config = ScoringConfig::default();
        config.screening.activity.light = Some("+4".to_string());
        let scorer = RiskScorer::new(&config).unwrap();

        let mut profile = healthy_profile();
        profile.activity = ActivityLevel::Light;
        let result = scorer.score(&profile, None).unwrap();
        assert_eq!(contribution(&result, FactorKind::PhysicalActivity), Some(4.0));
    }
}
