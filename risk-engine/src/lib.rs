//! Maternal risk assessment engine.
//!
//! Wires the scoring pipeline from `risk_assessment` to storage and to the
//! escalation coordinator from `risk_escalation`:
//!
//! ```text
//! assess(profile, observation)
//!   ├─ classifier ready?              ── ModelNotReady
//!   ├─ latest stored observation
//!   ├─ mandatory vitals present?      ── InsufficientData
//!   ├─ staleness policy               ── reuse stored assessment (Ttl only)
//!   ├─ normalize → classify → score → aggregate
//!   ├─ store observation + assessment
//!   └─ High? → alert + background notification fan-out
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod records;

pub use config::{EngineConfig, LoggingConfig};
pub use engine::{AssessmentOutcome, RiskEngine, RiskEngineBuilder};
pub use error::{EngineError, Result};
pub use records::{
    AssessmentRepository, InMemoryAssessmentStore, InMemoryObservationStore, ObservationRepository,
};
