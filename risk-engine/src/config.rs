//! Engine configuration.

use std::path::Path;

use risk_assessment::{ArtifactPaths, FeatureDefaults, StalenessPolicy};
use risk_escalation::EscalationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Top-level configuration, usually read from `risk-engine.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classifier artifact location
    pub classifier: ArtifactPaths,
    /// Fallbacks for optional features with no value in the timeline
    pub features: FeatureDefaults,
    /// When a stored assessment may be reused
    pub staleness: StalenessPolicy,
    /// Alerting and delivery
    pub escalation: EscalationConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content).map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "risk_engine=info".to_string(),
            json: false,
        }
    }
}
