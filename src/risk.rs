//! Risk scoring
//!
//! Converts discrete [`FlagEvent`]s into one cumulative, decaying risk score.
//!
//! ```text
//! points = base_points(type) × severity (hard 1.5, soft 1.0)
//!        × (0.5 + 0.5 · confidence) × duration (seconds, eyes_off/face_missing only)
//! ```
//!
//! The score decays at `decay_rate` points per second, but only once
//! `clean_behavior_window_ms` has passed without a flag. Crossing the review
//! threshold marks the session as under review for the rest of its life.

use crate::clock::{checked_offset, millis_between, Clock};
use crate::error::VigilError;
use crate::types::{FlagEvent, FlagType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const HARD_SEVERITY_MULTIPLIER: f64 = 1.5;
const SOFT_SEVERITY_MULTIPLIER: f64 = 1.0;

/// Base points per flag type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasePoints {
    /// Per second of duration
    pub eyes_off: f64,
    pub head_pose: f64,
    pub tab_blur: f64,
    pub second_face: f64,
    pub device_object: f64,
    pub shadow_anomaly: f64,
    /// Per second of duration
    pub face_missing: f64,
    pub down_glance: f64,
    pub integrity_violation: f64,
    pub fullscreen_exit: f64,
}

impl Default for BasePoints {
    fn default() -> Self {
        Self {
            eyes_off: 5.0,
            head_pose: 3.0,
            tab_blur: 10.0,
            second_face: 20.0,
            device_object: 15.0,
            shadow_anomaly: 5.0,
            face_missing: 8.0,
            down_glance: 4.0,
            integrity_violation: 25.0,
            fullscreen_exit: 10.0,
        }
    }
}

impl BasePoints {
    pub fn get(&self, flag_type: FlagType) -> f64 {
        match flag_type {
            FlagType::EyesOff => self.eyes_off,
            FlagType::HeadPose => self.head_pose,
            FlagType::TabBlur => self.tab_blur,
            FlagType::SecondFace => self.second_face,
            FlagType::DeviceObject => self.device_object,
            FlagType::ShadowAnomaly => self.shadow_anomaly,
            FlagType::FaceMissing => self.face_missing,
            FlagType::DownGlance => self.down_glance,
            FlagType::IntegrityViolation => self.integrity_violation,
            FlagType::FullscreenExit => self.fullscreen_exit,
        }
    }
}

/// Risk calculator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub base_points: BasePoints,
    /// Points removed per second of clean behavior
    pub decay_rate: f64,
    pub max_score: f64,
    /// Score at which the session goes under review
    pub review_threshold: f64,
    /// Flag-free time before decay starts
    pub clean_behavior_window_ms: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_points: BasePoints::default(),
            decay_rate: 0.5,
            max_score: 100.0,
            review_threshold: 60.0,
            clean_behavior_window_ms: 5000,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), VigilError> {
        for flag_type in FlagType::ALL {
            let points = self.base_points.get(flag_type);
            if !points.is_finite() || points < 0.0 {
                return Err(VigilError::InvalidConfig(format!(
                    "base points for {flag_type} must be finite and non-negative, got {points}"
                )));
            }
        }
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(VigilError::InvalidConfig(format!(
                "decay_rate must be finite and non-negative, got {}",
                self.decay_rate
            )));
        }
        if !(self.max_score > 0.0) || !self.max_score.is_finite() {
            return Err(VigilError::InvalidConfig(format!(
                "max_score must be positive, got {}",
                self.max_score
            )));
        }
        if !(self.review_threshold > 0.0 && self.review_threshold <= self.max_score) {
            return Err(VigilError::InvalidConfig(format!(
                "review_threshold must be in (0, max_score], got {}",
                self.review_threshold
            )));
        }
        Ok(())
    }
}

/// Risk band relative to the review threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Below 50% of the review threshold
    Low,
    /// Below 75%
    Medium,
    /// Below 100%
    High,
    /// At or above the review threshold
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64, review_threshold: f64) -> Self {
        let ratio = score / review_threshold;
        if ratio < 0.5 {
            RiskLevel::Low
        } else if ratio < 0.75 {
            RiskLevel::Medium
        } else if ratio < 1.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry for one processed flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub severity: Severity,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// Snapshot of the calculator's mutable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreState {
    pub score: f64,
    pub last_flag_time: Option<DateTime<Utc>>,
    pub flag_history: Vec<FlagRecord>,
    /// When decay most recently began; cleared by every new flag
    pub clean_behavior_start: Option<DateTime<Utc>>,
    pub is_under_review: bool,
    pub review_triggered_at: Option<DateTime<Utc>>,
}

impl RiskScoreState {
    fn new() -> Self {
        Self {
            score: 0.0,
            last_flag_time: None,
            flag_history: Vec::new(),
            clean_behavior_start: None,
            is_under_review: false,
            review_triggered_at: None,
        }
    }
}

/// Count and summed points for one flag type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagTypeSummary {
    pub count: usize,
    pub points: f64,
}

/// Reviewer-facing summary of a session's risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub session_id: Uuid,
    pub assessed_at: DateTime<Utc>,
    pub score: f64,
    pub level: RiskLevel,
    pub is_under_review: bool,
    pub review_triggered_at: Option<DateTime<Utc>>,
    pub total_flags: usize,
    pub last_flag_time: Option<DateTime<Utc>>,
    /// Time since the last flag (or session start)
    pub clean_behavior_duration_ms: u64,
    pub breakdown: BTreeMap<FlagType, FlagTypeSummary>,
}

/// Cumulative decaying risk score for one session
pub struct RiskScoreCalculator {
    config: RiskConfig,
    clock: Arc<dyn Clock>,
    state: RiskScoreState,
    session_id: Uuid,
    session_start: DateTime<Utc>,
    last_decay_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for RiskScoreCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskScoreCalculator")
            .field("session_id", &self.session_id)
            .field("score", &self.state.score)
            .field("is_under_review", &self.state.is_under_review)
            .finish_non_exhaustive()
    }
}

impl RiskScoreCalculator {
    pub fn new(config: RiskConfig, clock: Arc<dyn Clock>) -> Result<Self, VigilError> {
        config.validate()?;
        let session_start = clock.now();
        Ok(Self {
            config,
            clock,
            state: RiskScoreState::new(),
            session_id: Uuid::new_v4(),
            session_start,
            last_decay_at: None,
        })
    }

    /// Score a flag, returning the points it added
    pub fn process_flag(&mut self, flag: &FlagEvent) -> f64 {
        let now = self.clock.now();
        self.apply_decay(now);

        let points = self.points_for(flag);
        self.state.score = (self.state.score + points).clamp(0.0, self.config.max_score);
        self.state.last_flag_time = Some(now);
        self.state.clean_behavior_start = None;
        self.last_decay_at = None;
        self.state.flag_history.push(FlagRecord {
            timestamp: now,
            flag_type: flag.flag_type,
            severity: flag.severity,
            points,
            question_id: flag.question_id.clone(),
        });

        log::debug!(
            "risk flag {} ({}): +{points:.2} → {:.2}",
            flag.flag_type,
            flag.severity,
            self.state.score
        );
        self.check_review(now);
        points
    }

    /// Points a flag is worth under the current configuration
    pub fn points_for(&self, flag: &FlagEvent) -> f64 {
        let severity = match flag.severity {
            Severity::Hard => HARD_SEVERITY_MULTIPLIER,
            Severity::Soft => SOFT_SEVERITY_MULTIPLIER,
        };
        // NaN carries no evidence and would otherwise poison the running score
        let confidence = if flag.confidence.is_nan() {
            0.0
        } else {
            flag.confidence.clamp(0.0, 1.0)
        };
        let confidence = 0.5 + 0.5 * confidence;
        let duration = match flag.duration_ms {
            Some(ms) if flag.flag_type.is_duration_sensitive() => ms as f64 / 1000.0,
            _ => 1.0,
        };
        self.config.base_points.get(flag.flag_type) * severity * confidence * duration
    }

    /// Apply any decay due as of now and return the score
    pub fn update_score(&mut self) -> f64 {
        let now = self.clock.now();
        self.apply_decay(now);
        self.state.score
    }

    /// Start of the clean period that gates decay, `None` when the window
    /// reaches past the representable range and decay never begins
    fn grace_end(&self) -> Option<DateTime<Utc>> {
        let anchor = self.state.last_flag_time.unwrap_or(self.session_start);
        checked_offset(anchor, self.config.clean_behavior_window_ms)
    }

    /// Decay is applied incrementally from the later of the grace-window end and
    /// the previous application, so polling frequency does not change the total.
    /// The decay mark only moves forward: a clock stepping backwards applies
    /// nothing and leaves the mark in place.
    fn apply_decay(&mut self, now: DateTime<Utc>) {
        let Some(grace_end) = self.grace_end() else {
            return;
        };
        if now <= grace_end {
            return;
        }
        if self.state.clean_behavior_start.is_none() {
            self.state.clean_behavior_start = Some(grace_end);
        }

        let from = self.last_decay_at.map_or(grace_end, |at| at.max(grace_end));
        if now <= from {
            return;
        }
        let seconds = millis_between(from, now) / 1000.0;
        self.state.score = (self.state.score - self.config.decay_rate * seconds).max(0.0);
        self.last_decay_at = Some(now);
    }

    fn check_review(&mut self, now: DateTime<Utc>) {
        if !self.state.is_under_review && self.state.score >= self.config.review_threshold {
            self.state.is_under_review = true;
            self.state.review_triggered_at = Some(now);
            log::info!(
                "session {} under review (score {:.2} ≥ {:.2})",
                self.session_id,
                self.state.score,
                self.config.review_threshold
            );
        }
    }

    /// Score expected `ahead_ms` from now if no further flags arrive. Does not
    /// mutate the calculator.
    pub fn projected_score(&self, ahead_ms: u64) -> f64 {
        let Some(grace_end) = self.grace_end() else {
            return self.state.score;
        };
        let from = self.last_decay_at.map_or(grace_end, |at| at.max(grace_end));
        // Measured as an offset from now so any look-ahead stays representable
        let millis = millis_between(from, self.clock.now()) + ahead_ms as f64;
        let seconds = (millis / 1000.0).max(0.0);
        (self.state.score - self.config.decay_rate * seconds).max(0.0)
    }

    pub fn score(&self) -> f64 {
        self.state.score
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.state.score, self.config.review_threshold)
    }

    pub fn is_under_review(&self) -> bool {
        self.state.is_under_review
    }

    /// Audit summary, after applying any pending decay
    pub fn assessment(&mut self) -> RiskAssessment {
        let now = self.clock.now();
        self.apply_decay(now);

        let mut breakdown: BTreeMap<FlagType, FlagTypeSummary> = BTreeMap::new();
        for record in &self.state.flag_history {
            let entry = breakdown.entry(record.flag_type).or_default();
            entry.count += 1;
            entry.points += record.points;
        }

        let clean_since = self.state.last_flag_time.unwrap_or(self.session_start);
        let clean_behavior_duration_ms = (now - clean_since).num_milliseconds().max(0) as u64;

        RiskAssessment {
            session_id: self.session_id,
            assessed_at: now,
            score: self.state.score,
            level: self.risk_level(),
            is_under_review: self.state.is_under_review,
            review_triggered_at: self.state.review_triggered_at,
            total_flags: self.state.flag_history.len(),
            last_flag_time: self.state.last_flag_time,
            clean_behavior_duration_ms,
            breakdown,
        }
    }

    /// Swap the configuration.
    ///
    /// Decay owed under the old rate is settled first. A lower review threshold can
    /// put the session under review; a higher one never takes it out.
    pub fn update_config(&mut self, config: RiskConfig) -> Result<(), VigilError> {
        config.validate()?;
        let now = self.clock.now();
        self.apply_decay(now);

        self.config = config;
        self.state.score = self.state.score.min(self.config.max_score);
        self.check_review(now);
        log::info!("risk configuration updated");
        Ok(())
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn flag_history(&self) -> &[FlagRecord] {
        &self.state.flag_history
    }

    pub fn state(&self) -> &RiskScoreState {
        &self.state
    }

    /// Start a fresh session
    pub fn reset(&mut self) {
        self.state = RiskScoreState::new();
        self.session_id = Uuid::new_v4();
        self.session_start = self.clock.now();
        self.last_decay_at = None;
        log::debug!("risk session reset ({})", self.session_id);
    }
}
