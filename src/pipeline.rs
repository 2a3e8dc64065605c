//! Pipeline orchestration
//!
//! [`AttentionMonitor`] owns one of each stage and a shared clock:
//!
//! ```text
//! RawSignalFrame → TemporalFilterSystem → SignalBundle → SignalProcessor → DecisionResult
//! FlagEvent ─┬→ RiskScoreCalculator → score / level / review
//!            └→ AlertEngine → soft / hard alerts
//! ```
//!
//! Deciding when a run of decisions becomes a [`FlagEvent`] is left to the
//! integrator; the monitor only routes flags to both consumers.

use crate::alerts::{Alert, AlertConfig, AlertEngine, AlertListener, ToneSinkFactory};
use crate::clock::{Clock, SystemClock};
use crate::error::VigilError;
use crate::processor::{ProcessorConfig, SignalProcessor};
use crate::risk::{RiskAssessment, RiskConfig, RiskLevel, RiskScoreCalculator};
use crate::temporal::{TemporalFilterConfig, TemporalFilterSystem};
use crate::types::{DecisionResult, FlagEvent, RawSignalFrame, SignalBundle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for every stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub temporal: TemporalFilterConfig,
    pub processor: ProcessorConfig,
    pub risk: RiskConfig,
    pub alerts: AlertConfig,
}

impl MonitorConfig {
    /// Parse and validate; missing sections take their defaults
    pub fn from_json(json: &str) -> Result<Self, VigilError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, VigilError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), VigilError> {
        self.temporal.validate()?;
        self.processor.clone().validated()?;
        self.risk.validate()?;
        self.alerts.validate()
    }
}

/// Result of routing one flag to the risk calculator and the alert engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOutcome {
    /// Risk points the flag added
    pub points: f64,
    pub score: f64,
    pub level: RiskLevel,
    pub under_review: bool,
    /// Alert raised by this flag, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

/// One monitored session
#[derive(Debug)]
pub struct AttentionMonitor {
    filter: TemporalFilterSystem,
    processor: SignalProcessor,
    risk: RiskScoreCalculator,
    alerts: AlertEngine,
}

impl AttentionMonitor {
    pub fn new(config: MonitorConfig, clock: Arc<dyn Clock>) -> Result<Self, VigilError> {
        Ok(Self {
            filter: TemporalFilterSystem::new(config.temporal)?,
            processor: SignalProcessor::new(config.processor)?,
            risk: RiskScoreCalculator::new(config.risk, Arc::clone(&clock))?,
            alerts: AlertEngine::new(config.alerts, clock)?,
        })
    }

    /// Monitor driven by the wall clock
    pub fn with_system_clock(config: MonitorConfig) -> Result<Self, VigilError> {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn with_tone_sink_factory(mut self, factory: ToneSinkFactory) -> Self {
        self.alerts.set_tone_sink_factory(factory);
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn AlertListener>) {
        self.alerts.add_listener(listener);
    }

    /// Filter and fuse one raw frame
    pub fn process_frame(&mut self, frame: &RawSignalFrame) -> Result<DecisionResult, VigilError> {
        let bundle = self.filter.filter(frame)?;
        Ok(self.processor.process(&bundle))
    }

    /// Fuse a frame that was filtered elsewhere
    pub fn process_bundle(&mut self, bundle: &SignalBundle) -> DecisionResult {
        self.processor.process(bundle)
    }

    /// Route a flag to both the risk calculator and the alert engine
    pub fn report_flag(&mut self, flag: &FlagEvent) -> FlagOutcome {
        let points = self.risk.process_flag(flag);
        let alert = self.alerts.process_flag(flag);
        FlagOutcome {
            points,
            score: self.risk.score(),
            level: self.risk.risk_level(),
            under_review: self.risk.is_under_review(),
            alert,
        }
    }

    /// Host tick: settle risk decay and dismiss expired soft alerts
    pub fn poll(&mut self) -> Vec<Alert> {
        self.risk.update_score();
        self.alerts.poll_timers()
    }

    pub fn assessment(&mut self) -> RiskAssessment {
        self.risk.assessment()
    }

    pub fn processor(&self) -> &SignalProcessor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut SignalProcessor {
        &mut self.processor
    }

    pub fn filter(&self) -> &TemporalFilterSystem {
        &self.filter
    }

    pub fn risk(&self) -> &RiskScoreCalculator {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskScoreCalculator {
        &mut self.risk
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertEngine {
        &mut self.alerts
    }

    /// Start a new session with the same configuration
    pub fn reset(&mut self) {
        self.filter.reset();
        self.processor.reset();
        self.risk.reset();
        self.alerts.clear_all_alerts();
    }

    /// Shut down alerting; frame processing keeps working
    pub fn dispose(&mut self) {
        self.alerts.dispose();
    }
}
