use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::profile::{LabValues, PatientProfile};
use crate::scoring::RiskResult;

pub const REPORT_VERSION: u32 = 1;

/// A saved assessment: the inputs and the result they produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub profile: PatientProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labs: Option<LabValues>,
    pub result: RiskResult,
}

impl AssessmentReport {
    pub fn new(profile: PatientProfile, labs: Option<LabValues>, result: RiskResult) -> Self {
        Self {
            version: REPORT_VERSION,
            generated_at: Utc::now(),
            profile,
            labs,
            result,
        }
    }
}

/// Load a report from a JSON file.
///
/// Fails if the file is missing or was written by an unsupported version.
pub fn load_report(path: &Path) -> Result<AssessmentReport> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open report at {}", path.display()))?;

    let report: AssessmentReport = serde_json::from_reader(file)
        .with_context(|| format!("Failed to load report from {}", path.display()))?;

    if report.version != REPORT_VERSION {
        anyhow::bail!("Unsupported report version: {}", report.version);
    }

    info!(path = %path.display(), "loaded report");
    Ok(report)
}

/// Save a report to a JSON file atomically
///
/// The file is never left half-written. Parent directories are created.
pub fn save_report(path: &Path, report: &AssessmentReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, report).context("Failed to serialize report")?;

    file.commit()
        .with_context(|| format!("Failed to save report to {}", path.display()))?;

    info!(path = %path.display(), "saved report");
    Ok(())
}
