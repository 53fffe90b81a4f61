//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ahp/ahp.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `AHP_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{DepthPolicy, Tolerance, ACCEPTABLE_CONSISTENCY_RATIO};

/// Unified configuration for ahp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// How uneven criteria depth is handled (default: strict)
    pub depth_policy: DepthPolicy,
    /// Largest consistency ratio reported as acceptable (default: 0.1)
    pub consistency_threshold: f64,
    /// Digits printed for priorities and ratios
    pub precision: usize,
    /// Reciprocity tolerance for comparison matrices
    pub tolerance: Tolerance,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            depth_policy: DepthPolicy::default(),
            consistency_threshold: ACCEPTABLE_CONSISTENCY_RATIO,
            precision: 4,
            tolerance: Tolerance::default(),
        }
    }
}

/// Partially specified settings as found in a config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    depth_policy: Option<DepthPolicy>,
    consistency_threshold: Option<f64>,
    tolerance: Option<RawTolerance>,
    precision: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawTolerance {
    rtol: Option<f64>,
    atol: Option<f64>,
}

/// Get the XDG config directory for ahp.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ahp").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ahp.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load configuration with full precedence.
    ///
    /// A missing global file is skipped; an explicit `local` file must exist.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = local {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            debug!(path = %path.display(), "loading local config");
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let tolerance = overlay.tolerance.as_ref().map_or(self.tolerance, |t| Tolerance {
            rtol: t.rtol.unwrap_or(self.tolerance.rtol),
            atol: t.atol.unwrap_or(self.tolerance.atol),
        });
        Self {
            depth_policy: overlay.depth_policy.unwrap_or(self.depth_policy),
            consistency_threshold: overlay
                .consistency_threshold
                .unwrap_or(self.consistency_threshold),
            precision: overlay.precision.unwrap_or(self.precision),
            tolerance,
        }
    }

    /// Apply AHP_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("AHP").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("depth_policy") {
            settings.depth_policy = match val.to_ascii_lowercase().as_str() {
                "strict" => DepthPolicy::Strict,
                "normalize" => DepthPolicy::Normalize,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("unknown depth policy: {other}"),
                    })
                }
            };
        }
        if let Ok(val) = config.get_float("consistency_threshold") {
            settings.consistency_threshold = val;
        }
        if let Ok(val) = config.get_float("tolerance.rtol") {
            settings.tolerance.rtol = val;
        }
        if let Ok(val) = config.get_float("tolerance.atol") {
            settings.tolerance.atol = val;
        }
        if let Ok(val) = config.get_int("precision") {
            settings.precision = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("precision must not be negative: {val}"),
            })?;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if !(self.consistency_threshold.is_finite() && self.consistency_threshold >= 0.0) {
            return Err(ApplicationError::Config {
                message: format!(
                    "consistency_threshold must be a non-negative number: {}",
                    self.consistency_threshold
                ),
            });
        }
        if self.tolerance.rtol < 0.0 || self.tolerance.atol < 0.0 {
            return Err(ApplicationError::Config {
                message: "tolerance values must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ahp configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ahp/ahp.toml
#   Local:  file given with --config
#   Env:    AHP_* environment variables, nested keys with "__" (AHP_TOLERANCE__RTOL)

# "strict" rejects criteria trees of uneven depth, "normalize" pads them
# depth_policy = "strict"

# Largest acceptable consistency ratio
# consistency_threshold = 0.1

# Digits printed for priorities
# precision = 4

[tolerance]
# Reciprocity check: |a_ij - 1/a_ji| <= atol + rtol * |1/a_ji|
# rtol = 1e-5
# atol = 1e-8
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
