pub mod advice;
pub mod config;
pub mod engine;
pub mod factors;
pub mod result;
pub mod validation;

pub use config::*;
pub use engine::{logistic_percent, RiskScorer};
pub use factors::{BandTable, Direction, Effect, RangeOp};
pub use result::{
    AssessmentKind, ClinicalNote, FactorKind, NoteSeverity, RiskFactor, RiskResult, RiskTier,
};
pub use validation::validate_scoring;
