//! Maternal risk scoring.
//!
//! Turns a vitals/history observation into a [`RiskAssessment`]:
//!
//! - **Feature normalization**: merge with history and defaults, bound-check
//! - **Classifier wrapper**: pre-trained multinomial model + label map
//! - **Condition scorers**: preeclampsia, preterm labor, gestational diabetes
//! - **Aggregation**: most-conservative-wins overall level and score
//! - **Staleness**: recompute policy and mandatory-vitals check
//!
//! # Architecture
//!
//! ```text
//! Observation ──► FeatureNormalizer ──┬──► RiskClassifier ───────┐
//!                                     │                          ▼
//!                                     └──► ConditionScorer ×3 ─► RiskAggregator ──► RiskAssessment
//! ```
//!
//! Everything here is synchronous and side-effect free; the loaded classifier
//! is immutable and can be shared across threads behind an `Arc`.

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod scorers;
pub mod staleness;
pub mod types;

pub use aggregator::RiskAggregator;
pub use classifier::{ArtifactPaths, ClassifierPrediction, RiskClassifier};
pub use error::{AssessmentError, Result};
pub use features::{FeatureDefaults, FeatureNormalizer, FeatureVector, FEATURE_ORDER};
pub use pipeline::ScoringPipeline;
pub use staleness::{StalenessDecision, StalenessEvaluator, StalenessPolicy};
pub use types::*;
