//! Multinomial logistic model evaluated over a standardized feature vector.

use serde::{Deserialize, Serialize};

use crate::features::FEATURE_COUNT;

/// Serialized form of the trained model (`model.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Model version tag, informational
    #[serde(default)]
    pub version: Option<String>,
    /// Per-feature mean used for standardization
    pub means: Vec<f64>,
    /// Per-feature scale used for standardization
    pub scales: Vec<f64>,
    /// One coefficient row per class
    pub coefficients: Vec<Vec<f64>>,
    /// One intercept per class
    pub intercepts: Vec<f64>,
}

impl LogisticModel {
    /// Number of output classes.
    pub fn class_count(&self) -> usize {
        self.intercepts.len()
    }

    /// Check dimensions against the feature count.
    pub fn validate(&self) -> Result<(), String> {
        if self.means.len() != FEATURE_COUNT || self.scales.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} means/scales, got {}/{}",
                FEATURE_COUNT,
                self.means.len(),
                self.scales.len()
            ));
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err("scales must be finite and non-zero".to_string());
        }
        if self.intercepts.len() < 2 {
            return Err("model needs at least two classes".to_string());
        }
        if self.coefficients.len() != self.intercepts.len() {
            return Err(format!(
                "{} coefficient rows for {} classes",
                self.coefficients.len(),
                self.intercepts.len()
            ));
        }
        if let Some(row) = self.coefficients.iter().find(|r| r.len() != FEATURE_COUNT) {
            return Err(format!(
                "coefficient row has {} entries, expected {}",
                row.len(),
                FEATURE_COUNT
            ));
        }
        Ok(())
    }

    /// Class probabilities for a raw (unstandardized) feature vector.
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let standardized: Vec<f64> = features
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(&standardized).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        softmax(&logits)
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
