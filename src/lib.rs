//! Vigil - attention decision engine
//!
//! Vigil judges, frame by frame, whether a monitored subject is attentively
//! engaged, accumulates violations into a decaying risk score, and turns sustained
//! or severe violations into a debounced alert stream:
//! raw frame → temporal filtering → decision fusion → {risk scoring, alerting}.
//!
//! ## Modules
//!
//! - **Filters**: Kalman, EMA, circular buffer and outlier primitives
//! - **Temporal**: per-frame smoothing and stability metrics
//! - **Processor**: weighted multi-channel decision fusion with hysteresis
//! - **Risk**: cumulative decaying risk score with a one-way review flag
//! - **Alerts**: tiered, debounced soft/hard alerts with audio cues

pub mod alerts;
pub mod clock;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod processor;
pub mod risk;
pub mod temporal;
pub mod types;

pub use alerts::{Alert, AlertConfig, AlertEngine, AlertKind, AlertListener};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AudioError, VigilError};
pub use pipeline::{AttentionMonitor, FlagOutcome, MonitorConfig};
pub use processor::{ProcessorConfig, SignalProcessor};
pub use risk::{RiskAssessment, RiskConfig, RiskLevel, RiskScoreCalculator};
pub use temporal::{TemporalFilterConfig, TemporalFilterSystem};
pub use types::{DecisionResult, FlagEvent, FlagType, RawSignalFrame, Severity, SignalBundle};

/// Vigil version
pub const VIGIL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "vigil";
