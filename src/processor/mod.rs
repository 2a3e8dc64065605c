//! Decision fusion
//!
//! The [`SignalProcessor`] turns one filtered [`SignalBundle`] into one
//! [`DecisionResult`]:
//!
//! 1. Score gaze, head pose, environment and temporal consistency independently
//! 2. Fuse the four scores with normalized weights against a raw threshold
//! 3. Pass the raw decision through a temporal-consistency gate so single noisy
//!    frames cannot flip a stable state
//! 4. Record the frame in bounded history buffers
//!
//! Pipeline: SignalBundle → Sub-scores → Weighted fusion → Consistency gate → DecisionResult

pub mod config;
pub mod scoring;

pub use config::{
    CalibrationProfile, ChannelWeights, ProcessorConfig, ProcessorThresholds, TemporalSettings,
    WeightsUpdate,
};

use crate::error::VigilError;
use crate::filters::CircularBuffer;
use crate::types::{
    ChannelScore, DecisionBreakdown, DecisionMetadata, DecisionResult, DiagnosticFlag,
    SignalBundle,
};
use scoring::{
    compute_environment_score, compute_gaze_score, compute_head_pose_score,
    compute_signal_quality, compute_temporal_score, push_flag, NEUTRAL_SCORE,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Per-axis gaze-vector standard deviation at which gaze motion stability reaches 0
const GAZE_MOTION_SCALE: f64 = 0.2;
/// Per-axis head-angle standard deviation (degrees) at which head motion stability reaches 0
const HEAD_MOTION_SCALE_DEG: f64 = 15.0;

/// Diagnostics over the processor's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorStatistics {
    pub average_processing_time_ms: f64,
    /// Share of recorded decisions agreeing with the majority (0-1)
    pub decision_consistency: f64,
    /// 1 − 2·std(confidence), clamped to 0-1
    pub confidence_stability: f64,
    pub history_size: usize,
}

/// Stateful per-session decision fusion engine
#[derive(Debug, Clone)]
pub struct SignalProcessor {
    config: ProcessorConfig,
    decisions: CircularBuffer<bool>,
    confidences: CircularBuffer<f64>,
    gaze_history: CircularBuffer<[f64; 3]>,
    head_history: CircularBuffer<[f64; 2]>,
    processing_times_ms: CircularBuffer<f64>,
}

impl SignalProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self, VigilError> {
        let config = config.validated()?;
        let size = config.temporal.history_size;
        Ok(Self {
            decisions: CircularBuffer::new(size)?,
            confidences: CircularBuffer::new(size)?,
            gaze_history: CircularBuffer::new(size)?,
            head_history: CircularBuffer::new(size)?,
            processing_times_ms: CircularBuffer::new(size)?,
            config,
        })
    }

    /// Fuse one filtered frame into a decision
    pub fn process(&mut self, bundle: &SignalBundle) -> DecisionResult {
        let started = Instant::now();
        let thresholds = &self.config.thresholds;
        let weights = self.config.weights;
        let mut flags = Vec::new();

        let gaze = compute_gaze_score(bundle, thresholds, &mut flags);
        let head_pose = compute_head_pose_score(bundle, thresholds, &mut flags);
        let environment = compute_environment_score(bundle, thresholds, &mut flags);
        let temporal = self.temporal_score(&mut flags);

        let breakdown = DecisionBreakdown {
            gaze: ChannelScore::new(gaze, weights.gaze),
            head_pose: ChannelScore::new(head_pose, weights.head_pose),
            environment: ChannelScore::new(environment, weights.environment),
            temporal: ChannelScore::new(temporal, weights.temporal),
        };
        let weighted_score = breakdown.weighted_score();

        let raw_decision = weighted_score >= self.config.decision_threshold;
        let is_attentive = self.apply_consistency_gate(raw_decision);

        let signal_quality = compute_signal_quality(bundle);
        let confidence =
            (weighted_score - (1.0 - signal_quality) * 0.3 + temporal * 0.2).clamp(0.0, 1.0);

        self.record(bundle, raw_decision, confidence);

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.processing_times_ms.push(processing_time_ms);

        DecisionResult {
            timestamp: bundle.timestamp,
            is_attentive,
            confidence,
            breakdown,
            flags,
            metadata: DecisionMetadata {
                processing_time_ms,
                signal_quality,
                temporal_consistency: temporal,
            },
        }
    }

    fn has_history(&self) -> bool {
        self.decisions.len() >= self.config.temporal.min_history
    }

    /// Share of positive decisions among the most recent ones
    fn recent_positive_ratio(&self) -> f64 {
        let window = self.config.temporal.recent_window;
        let (positives, total) = self
            .decisions
            .recent(window)
            .fold((0usize, 0usize), |(p, n), &d| (p + usize::from(d), n + 1));
        if total == 0 {
            return 0.0;
        }
        positives as f64 / total as f64
    }

    fn temporal_score(&self, flags: &mut Vec<DiagnosticFlag>) -> f64 {
        if !self.has_history() {
            push_flag(flags, DiagnosticFlag::InsufficientHistory);
            return NEUTRAL_SCORE;
        }

        let confidence_stability = (1.0 - self.confidences.standard_deviation() * 2.0).clamp(0.0, 1.0);
        let motion_stability = (self.gaze_motion_stability() + self.head_motion_stability()) / 2.0;
        compute_temporal_score(
            self.recent_positive_ratio(),
            confidence_stability,
            motion_stability,
        )
    }

    /// Hysteresis over the recent window.
    ///
    /// A positive raw decision survives only if the recent window is mostly
    /// positive; a negative one is overridden unless the recent window is mostly
    /// negative.
    fn apply_consistency_gate(&self, raw_decision: bool) -> bool {
        if !self.has_history() {
            return raw_decision;
        }
        let ratio = self.config.temporal.consistency_ratio;
        let positive_ratio = self.recent_positive_ratio();
        if raw_decision {
            positive_ratio >= ratio
        } else {
            (1.0 - positive_ratio) < ratio
        }
    }

    fn gaze_motion_stability(&self) -> f64 {
        if self.gaze_history.len() < 2 {
            return NEUTRAL_SCORE;
        }
        let mean_std = (0..3)
            .map(|axis| std_dev(self.gaze_history.iter().map(|g| g[axis])))
            .sum::<f64>()
            / 3.0;
        (1.0 - mean_std / GAZE_MOTION_SCALE).clamp(0.0, 1.0)
    }

    fn head_motion_stability(&self) -> f64 {
        if self.head_history.len() < 2 {
            return NEUTRAL_SCORE;
        }
        let mean_std = (0..2)
            .map(|axis| std_dev(self.head_history.iter().map(|h| h[axis])))
            .sum::<f64>()
            / 2.0;
        (1.0 - mean_std / HEAD_MOTION_SCALE_DEG).clamp(0.0, 1.0)
    }

    /// Push the raw decision and any trustworthy motion samples into history
    fn record(&mut self, bundle: &SignalBundle, raw_decision: bool, confidence: f64) {
        self.decisions.push(raw_decision);
        self.confidences.push(confidence);

        let floor = self.config.thresholds.noise_floor;
        if bundle.gaze.confidence > floor {
            let magnitude = bundle.gaze.magnitude();
            if magnitude > f64::EPSILON {
                self.gaze_history.push([
                    bundle.gaze.x / magnitude,
                    bundle.gaze.y / magnitude,
                    bundle.gaze.z / magnitude,
                ]);
            }
        }
        if bundle.head_pose.confidence > floor {
            self.head_history
                .push([bundle.head_pose.yaw, bundle.head_pose.pitch]);
        }
    }

    /// Override some channel weights; all four are renormalized to sum to 1.
    ///
    /// On error the previous weights stay in effect.
    pub fn update_weights(&mut self, update: WeightsUpdate) -> Result<ChannelWeights, VigilError> {
        let weights = self.config.weights.merged(&update)?;
        self.config.weights = weights;
        log::info!("processor weights updated: {weights:?}");
        Ok(weights)
    }

    /// Derive head yaw/pitch bounds from a subject's calibration
    pub fn update_calibration_profile(
        &mut self,
        profile: &CalibrationProfile,
    ) -> Result<(), VigilError> {
        let (yaw_max, pitch_max) = profile.bounds()?;
        self.config.thresholds.yaw_max_deg = yaw_max;
        self.config.thresholds.pitch_max_deg = pitch_max;
        log::info!("calibrated head bounds: yaw ±{yaw_max:.1}°, pitch ±{pitch_max:.1}°");
        Ok(())
    }

    /// Replace the whole configuration. History is kept (truncated to the new
    /// capacity, newest entries first).
    pub fn update_config(&mut self, config: ProcessorConfig) -> Result<(), VigilError> {
        let config = config.validated()?;
        let size = config.temporal.history_size;
        if size != self.config.temporal.history_size {
            self.decisions = resized(&self.decisions, size)?;
            self.confidences = resized(&self.confidences, size)?;
            self.gaze_history = resized(&self.gaze_history, size)?;
            self.head_history = resized(&self.head_history, size)?;
            self.processing_times_ms = resized(&self.processing_times_ms, size)?;
        }
        self.config = config;
        log::info!("processor configuration updated");
        Ok(())
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn statistics(&self) -> ProcessorStatistics {
        let history_size = self.decisions.len();
        let decision_consistency = if history_size == 0 {
            0.0
        } else {
            let positives = self.decisions.iter().filter(|&&d| d).count() as f64;
            let ratio = positives / history_size as f64;
            ratio.max(1.0 - ratio)
        };
        let confidence_stability = if self.confidences.is_empty() {
            0.0
        } else {
            (1.0 - self.confidences.standard_deviation() * 2.0).clamp(0.0, 1.0)
        };

        ProcessorStatistics {
            average_processing_time_ms: self.processing_times_ms.mean(),
            decision_consistency,
            confidence_stability,
            history_size,
        }
    }

    /// Clear all history
    pub fn reset(&mut self) {
        self.decisions.clear();
        self.confidences.clear();
        self.gaze_history.clear();
        self.head_history.clear();
        self.processing_times_ms.clear();
    }
}

fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    (values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
}

fn resized<T: Clone>(buffer: &CircularBuffer<T>, capacity: usize) -> Result<CircularBuffer<T>, VigilError> {
    let mut next = CircularBuffer::new(capacity)?;
    for item in buffer.recent(capacity) {
        next.push(item.clone());
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelStability, EnvironmentReading, GazeVector, HeadPose};
    use pretty_assertions::assert_eq;
    use chrono::{TimeZone, Utc};

    fn attentive_bundle() -> SignalBundle {
        SignalBundle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap(),
            face_detected: true,
            head_pose: HeadPose {
                yaw: 2.0,
                pitch: -1.0,
                roll: 0.0,
                confidence: 0.95,
            },
            gaze: GazeVector {
                x: 0.02,
                y: -0.01,
                z: 1.0,
                confidence: 0.92,
            },
            environment: EnvironmentReading::default(),
            stability: ChannelStability::default(),
        }
    }

    fn absent_bundle() -> SignalBundle {
        SignalBundle {
            face_detected: false,
            head_pose: HeadPose::default(),
            gaze: GazeVector::default(),
            ..attentive_bundle()
        }
    }

    fn processor() -> SignalProcessor {
        SignalProcessor::new(ProcessorConfig::default()).unwrap()
    }

    #[test]
    fn test_attentive_frame() {
        let mut processor = processor();
        let result = processor.process(&attentive_bundle());
        assert!(result.is_attentive);
        assert!(result.breakdown.gaze.score > 0.7);
        assert!(result.has_flag(DiagnosticFlag::InsufficientHistory));
        assert!((result.breakdown.temporal.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_absent_frame_without_history() {
        let mut processor = processor();
        let result = processor.process(&absent_bundle());
        assert!(!result.is_attentive);
        assert!(result.has_flag(DiagnosticFlag::FaceNotDetected));
        assert!(result.has_flag(DiagnosticFlag::LowHeadPoseConfidence));
        assert_eq!(result.metadata.signal_quality, 0.0);
    }

    #[test]
    fn test_contributions_match_score_times_weight() {
        let mut processor = processor();
        for bundle in [attentive_bundle(), absent_bundle(), attentive_bundle()] {
            let result = processor.process(&bundle);
            for channel in [
                result.breakdown.gaze,
                result.breakdown.head_pose,
                result.breakdown.environment,
                result.breakdown.temporal,
            ] {
                assert!((channel.contribution - channel.score * channel.weight).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_update_weights_renormalizes() {
        let mut processor = processor();
        let weights = processor
            .update_weights(WeightsUpdate {
                environment: Some(1.0),
                temporal: Some(0.0),
                ..Default::default()
            })
            .unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        assert_eq!(weights.temporal, 0.0);

        let result = processor.process(&attentive_bundle());
        let total = result.breakdown.gaze.weight
            + result.breakdown.head_pose.weight
            + result.breakdown.environment.weight
            + result.breakdown.temporal.weight;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_weight_update_keeps_previous() {
        let mut processor = processor();
        let before = processor.config().weights;
        let result = processor.update_weights(WeightsUpdate {
            gaze: Some(f64::NAN),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(processor.config().weights, before);
    }

    #[test]
    fn test_gate_holds_attentive_state_through_short_lapse() {
        let mut processor = processor();
        for _ in 0..10 {
            assert!(processor.process(&attentive_bundle()).is_attentive);
        }

        // Negative raw frames are upgraded until 7 of the last 10 are negative
        for lapse in 1..=7 {
            let result = processor.process(&absent_bundle());
            assert!(result.is_attentive, "lapse frame {lapse} should be held");
        }
        assert!(!processor.process(&absent_bundle()).is_attentive);
    }

    #[test]
    fn test_gate_requires_recent_majority_to_recover() {
        let mut processor = processor();
        for _ in 0..10 {
            processor.process(&absent_bundle());
        }
        // Window is all negative: a single good frame is downgraded
        assert!(!processor.process(&attentive_bundle()).is_attentive);
    }

    #[test]
    fn test_yaw_out_of_bounds_flag() {
        let mut processor = processor();
        let mut bundle = attentive_bundle();
        bundle.head_pose.yaw = 48.0;
        let result = processor.process(&bundle);
        assert!(result.has_flag(DiagnosticFlag::HeadYawOutOfBounds));
        assert!(!result.has_flag(DiagnosticFlag::HeadPitchOutOfBounds));
    }

    #[test]
    fn test_calibration_widens_bounds() {
        let mut processor = processor();
        processor
            .update_calibration_profile(&CalibrationProfile {
                yaw_range: (-45.0, 40.0),
                pitch_range: (-10.0, 10.0),
                margin_deg: 5.0,
            })
            .unwrap();
        assert_eq!(processor.config().thresholds.yaw_max_deg, 50.0);

        let mut bundle = attentive_bundle();
        bundle.head_pose.yaw = 48.0;
        let result = processor.process(&bundle);
        assert!(!result.has_flag(DiagnosticFlag::HeadYawOutOfBounds));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut processor = processor();
        for _ in 0..100 {
            processor.process(&attentive_bundle());
        }
        let stats = processor.statistics();
        assert_eq!(stats.history_size, 30);
        assert_eq!(stats.decision_consistency, 1.0);
        assert!(stats.average_processing_time_ms >= 0.0);
    }

    #[test]
    fn test_low_confidence_samples_skip_motion_history() {
        let mut processor = processor();
        let mut bundle = attentive_bundle();
        bundle.gaze.confidence = 0.05;
        bundle.head_pose.confidence = 0.05;
        processor.process(&bundle);
        assert_eq!(processor.gaze_history.len(), 0);
        assert_eq!(processor.head_history.len(), 0);
        assert_eq!(processor.decisions.len(), 1);
    }

    #[test]
    fn test_temporal_score_with_history() {
        let mut processor = processor();
        for _ in 0..6 {
            processor.process(&attentive_bundle());
        }
        let result = processor.process(&attentive_bundle());
        assert!(!result.has_flag(DiagnosticFlag::InsufficientHistory));
        // Steady positives, steady confidence, no motion
        assert!(result.breakdown.temporal.score > 0.95);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut processor = processor();
        for _ in 0..8 {
            processor.process(&attentive_bundle());
        }
        processor.reset();
        assert_eq!(processor.statistics().history_size, 0);
        let result = processor.process(&attentive_bundle());
        assert!(result.has_flag(DiagnosticFlag::InsufficientHistory));
    }

    #[test]
    fn test_update_config_resizes_history() {
        let mut processor = processor();
        for _ in 0..20 {
            processor.process(&attentive_bundle());
        }
        let mut config = processor.config().clone();
        config.temporal.history_size = 8;
        processor.update_config(config).unwrap();
        assert_eq!(processor.statistics().history_size, 8);

        let mut bad = processor.config().clone();
        bad.decision_threshold = 2.0;
        assert!(processor.update_config(bad).is_err());
        assert_eq!(processor.config().temporal.history_size, 8);
    }
}
