use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::profile::{LabValues, PatientProfile};

/// Assessment inputs read from a file.
///
/// ```yaml
/// profile:
///   age: 52
///   sex: male
///   height_cm: 177.8
///   weight_kg: 99.8
///   activity: sedentary
/// labs:
///   hba1c: 7.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentInput {
    pub profile: PatientProfile,
    #[serde(default)]
    pub labs: Option<LabValues>,
}

/// Read assessment inputs from a `.json` file, or YAML for any other extension.
pub fn load_input(path: &Path) -> Result<AssessmentInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file at {}", path.display()))?;
    parse_input(&content, is_json(path))
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_input(content: &str, json: bool) -> Result<AssessmentInput> {
    if json {
        Ok(serde_json::from_str(content)?)
    } else {
        serde_saphyr::from_str(content).map_err(|e| anyhow::anyhow!("{}", e))
    }
}
