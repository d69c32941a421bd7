//! CLI configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use exameval_core::scoring::MatchingMode;
use exameval_core::statistics::GradeScale;

/// Environment variable that overrides `default_mode`.
pub const MODE_ENV_VAR: &str = "EXAMEVAL_MODE";

/// Top-level exameval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamevalConfig {
    /// Matching mode used when `--mode` is not given.
    #[serde(default)]
    pub default_mode: MatchingMode,
    /// Max attempts graded concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for reports and graded attempts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Letter-grade thresholds.
    #[serde(default)]
    pub grade_scale: GradeScale,
}

fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./exameval-results")
}

impl Default for ExamevalConfig {
    fn default() -> Self {
        Self {
            default_mode: MatchingMode::default(),
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            grade_scale: GradeScale::default(),
        }
    }
}

impl ExamevalConfig {
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        anyhow::ensure!(
            self.grade_scale.is_ordered(),
            "grade_scale thresholds must not increase from a to d"
        );
        Ok(())
    }

    fn apply_mode_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(mode) = value {
            self.default_mode = mode
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{MODE_ENV_VAR}: {e}"))?;
        }
        Ok(())
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `exameval.toml` in the current directory
/// 2. `~/.config/exameval/config.toml`
///
/// `EXAMEVAL_MODE` overrides the configured default mode.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamevalConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("exameval.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<ExamevalConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => ExamevalConfig::default(),
    };

    let env_mode = std::env::var(MODE_ENV_VAR).ok();
    config.apply_mode_override(env_mode.as_deref())?;
    config.validate()?;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("exameval"))
}
