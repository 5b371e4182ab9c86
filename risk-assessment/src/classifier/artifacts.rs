//! Loading of the three classifier artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::LogisticModel;
use crate::error::{AssessmentError, Result};
use crate::features::FEATURE_ORDER;
use crate::types::RiskLevel;

/// Where the artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Directory containing the artifacts
    pub dir: PathBuf,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_labels_file")]
    pub labels_file: String,
    #[serde(default = "default_features_file")]
    pub features_file: String,
}

fn default_model_file() -> String {
    "model.json".to_string()
}

fn default_labels_file() -> String {
    "labels.json".to_string()
}

fn default_features_file() -> String {
    "features.json".to_string()
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir("models")
    }
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            model_file: default_model_file(),
            labels_file: default_labels_file(),
            features_file: default_features_file(),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.dir.join(&self.labels_file)
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(&self.features_file)
    }
}

/// Feature manifest: either a bare list or `{"features": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureManifest {
    List(Vec<String>),
    Wrapped { features: Vec<String> },
}

impl FeatureManifest {
    fn into_names(self) -> Vec<String> {
        match self {
            FeatureManifest::List(names) => names,
            FeatureManifest::Wrapped { features } => features,
        }
    }
}

/// Validated artifacts ready for prediction.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub model: LogisticModel,
    /// Risk level of each class index
    pub labels: Vec<RiskLevel>,
}

fn read_json<T: serde::de::DeserializeOwned>(artifact: &'static str, path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| AssessmentError::Artifact {
        artifact,
        reason: format!("{}: {}", path.display(), e),
    })?;
    serde_json::from_str(&content).map_err(|e| AssessmentError::Artifact {
        artifact,
        reason: format!("{}: {}", path.display(), e),
    })
}

/// Load and cross-check model, label map and feature manifest.
pub fn load(paths: &ArtifactPaths) -> Result<LoadedArtifacts> {
    let model: LogisticModel = read_json("model", &paths.model_path())?;
    model
        .validate()
        .map_err(|reason| AssessmentError::Artifact { artifact: "model", reason })?;

    let raw_labels: HashMap<String, String> = read_json("labels", &paths.labels_path())?;
    let labels = parse_labels(&raw_labels, model.class_count())?;

    let manifest: FeatureManifest = read_json("features", &paths.features_path())?;
    let names = manifest.into_names();
    if names.len() != FEATURE_ORDER.len() || names.iter().zip(FEATURE_ORDER).any(|(a, b)| a != b) {
        return Err(AssessmentError::Artifact {
            artifact: "features",
            reason: format!(
                "manifest order {:?} does not match expected {:?}",
                names, FEATURE_ORDER
            ),
        });
    }

    debug!(
        dir = %paths.dir.display(),
        classes = model.class_count(),
        version = ?model.version,
        "Classifier artifacts loaded"
    );

    Ok(LoadedArtifacts { model, labels })
}

fn parse_labels(raw: &HashMap<String, String>, classes: usize) -> Result<Vec<RiskLevel>> {
    let label_err = |reason: String| AssessmentError::Artifact {
        artifact: "labels",
        reason,
    };

    if raw.len() != classes {
        return Err(label_err(format!(
            "{} labels for {} model classes",
            raw.len(),
            classes
        )));
    }

    let mut labels = vec![None; classes];
    for (index, label) in raw {
        let idx: usize = index
            .parse()
            .map_err(|_| label_err(format!("class index {:?} is not a number", index)))?;
        let slot = labels
            .get_mut(idx)
            .ok_or_else(|| label_err(format!("class index {} out of range", idx)))?;
        let level = RiskLevel::from_label(label)
            .ok_or_else(|| label_err(format!("unrecognized label {:?}", label)))?;
        *slot = Some(level);
    }

    labels
        .into_iter()
        .enumerate()
        .map(|(i, l)| l.ok_or_else(|| label_err(format!("no label for class {}", i))))
        .collect()
}
