use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::schema::{Config, DEFAULT_TOP_FACTORS};
use crate::scoring::ScoringConfig;

const HEADER: &str = "\
# diarisk configuration
#
# Band tables are checked top to bottom and the first matching range wins.
# Ranges:  \"<N\", \"<=N\", \">N\", \">=N\"
# Effects: \"+N\"                 flat amount
#          \"+R per U\"           R points per U units past the range bound
#          \"+B then +R per U\"   base amount plus the per-unit part
#          append \"max C\" to cap a per-unit effect
# Tables must never let the score drop as a value moves toward higher risk;
# diarisk refuses to start if one does.
";

/// Write the built-in configuration to `path`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let config = Config {
        scoring: Some(ScoringConfig::default()),
        top_factors: DEFAULT_TOP_FACTORS,
    };

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    // Create parent directories
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, format!("{}\n{}", HEADER, yaml))
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;

    #[test]
    fn test_written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        write_default_config(&path, false).unwrap();
        let config = load_config(Some(path)).unwrap();

        assert_eq!(config.scoring, Some(ScoringConfig::default()));
        assert_eq!(config.top_factors, DEFAULT_TOP_FACTORS);
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "top_factors: 2\n").unwrap();

        let err = write_default_config(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "top_factors: 2\n");

        write_default_config(&path, true).unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.top_factors, DEFAULT_TOP_FACTORS);
    }
}
