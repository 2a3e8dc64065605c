//! Signal processor configuration
//!
//! All mutation goes through validating constructors or update functions; weights
//! are renormalized to sum to 1 every time they change.

use crate::error::VigilError;
use serde::{Deserialize, Serialize};

/// Relative weight of each channel in the fused score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelWeights {
    pub gaze: f64,
    pub head_pose: f64,
    pub environment: f64,
    pub temporal: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            gaze: 0.40,
            head_pose: 0.25,
            environment: 0.20,
            temporal: 0.15,
        }
    }
}

impl ChannelWeights {
    pub fn sum(&self) -> f64 {
        self.gaze + self.head_pose + self.environment + self.temporal
    }

    /// Validate and rescale so the four weights sum to 1
    pub fn normalized(self) -> Result<Self, VigilError> {
        let values = [self.gaze, self.head_pose, self.environment, self.temporal];
        if values.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(VigilError::InvalidWeights(format!(
                "weights must be finite and non-negative: {self:?}"
            )));
        }
        let sum = self.sum();
        if sum <= 0.0 {
            return Err(VigilError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(Self {
            gaze: self.gaze / sum,
            head_pose: self.head_pose / sum,
            environment: self.environment / sum,
            temporal: self.temporal / sum,
        })
    }

    /// Apply a partial override, then renormalize
    pub fn merged(self, update: &WeightsUpdate) -> Result<Self, VigilError> {
        Self {
            gaze: update.gaze.unwrap_or(self.gaze),
            head_pose: update.head_pose.unwrap_or(self.head_pose),
            environment: update.environment.unwrap_or(self.environment),
            temporal: update.temporal.unwrap_or(self.temporal),
        }
        .normalized()
    }
}

/// Partial weight override; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightsUpdate {
    pub gaze: Option<f64>,
    pub head_pose: Option<f64>,
    pub environment: Option<f64>,
    pub temporal: Option<f64>,
}

/// Per-channel decision thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorThresholds {
    /// Minimum gaze confidence for the gaze channel to count
    pub gaze_confidence: f64,
    /// Gaze deviation (degrees) at which the gaze score reaches 0
    pub gaze_angle_deg: f64,
    /// Minimum head-pose confidence; below it the channel is neutral
    pub head_pose_confidence: f64,
    /// Maximum absolute yaw (degrees)
    pub yaw_max_deg: f64,
    /// Maximum absolute pitch (degrees)
    pub pitch_max_deg: f64,
    pub lighting_min: f64,
    pub lighting_max: f64,
    /// Secondary-face presence at which the penalty saturates
    pub secondary_face: f64,
    /// Device-object presence at which the penalty saturates
    pub device_object: f64,
    /// Gaze stability below which `unstable_gaze` is raised
    pub unstable_gaze: f64,
    /// Gaze score below which `low_gaze_score` is raised
    pub low_gaze_score: f64,
    /// Confidence a gaze/head sample needs to enter the motion history
    pub noise_floor: f64,
}

impl Default for ProcessorThresholds {
    fn default() -> Self {
        Self {
            gaze_confidence: 0.7,
            gaze_angle_deg: 25.0,
            head_pose_confidence: 0.5,
            yaw_max_deg: 30.0,
            pitch_max_deg: 20.0,
            lighting_min: 0.3,
            lighting_max: 0.9,
            secondary_face: 0.5,
            device_object: 0.5,
            unstable_gaze: 0.6,
            low_gaze_score: 0.5,
            noise_floor: 0.1,
        }
    }
}

/// History and hysteresis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalSettings {
    /// Decisions required before temporal scoring and gating engage
    pub min_history: usize,
    /// Capacity of every history buffer
    pub history_size: usize,
    /// Most recent decisions considered by the consistency ratio
    pub recent_window: usize,
    /// Majority needed in the recent window to keep a decision
    pub consistency_ratio: f64,
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            min_history: 5,
            history_size: 30,
            recent_window: 10,
            consistency_ratio: 0.7,
        }
    }
}

/// Full signal processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub weights: ChannelWeights,
    pub thresholds: ProcessorThresholds,
    pub temporal: TemporalSettings,
    /// Weighted score at or above which the raw decision is "attentive"
    pub decision_threshold: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            weights: ChannelWeights::default(),
            thresholds: ProcessorThresholds::default(),
            temporal: TemporalSettings::default(),
            decision_threshold: 0.5,
        }
    }
}

impl ProcessorConfig {
    /// Check invariants and return a copy with normalized weights
    pub fn validated(mut self) -> Result<Self, VigilError> {
        self.weights = self.weights.normalized()?;

        let t = &self.thresholds;
        let positive = [
            ("gaze_angle_deg", t.gaze_angle_deg),
            ("yaw_max_deg", t.yaw_max_deg),
            ("pitch_max_deg", t.pitch_max_deg),
            ("secondary_face", t.secondary_face),
            ("device_object", t.device_object),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(VigilError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(t.lighting_min >= 0.0 && t.lighting_min < t.lighting_max && t.lighting_max <= 1.0) {
            return Err(VigilError::InvalidConfig(format!(
                "lighting range [{}, {}] must be an increasing range within [0, 1]",
                t.lighting_min, t.lighting_max
            )));
        }

        let temporal = &self.temporal;
        if temporal.history_size == 0 || temporal.recent_window == 0 {
            return Err(VigilError::InvalidCapacity(0));
        }
        if temporal.min_history > temporal.history_size {
            return Err(VigilError::InvalidConfig(format!(
                "min_history ({}) exceeds history_size ({})",
                temporal.min_history, temporal.history_size
            )));
        }
        if !(temporal.consistency_ratio > 0.0 && temporal.consistency_ratio <= 1.0) {
            return Err(VigilError::InvalidConfig(format!(
                "consistency_ratio must be in (0, 1], got {}",
                temporal.consistency_ratio
            )));
        }
        if !(self.decision_threshold >= 0.0 && self.decision_threshold <= 1.0) {
            return Err(VigilError::InvalidConfig(format!(
                "decision_threshold must be in [0, 1], got {}",
                self.decision_threshold
            )));
        }
        Ok(self)
    }
}

/// Per-subject head movement ranges captured during calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Observed (min, max) yaw in degrees
    pub yaw_range: (f64, f64),
    /// Observed (min, max) pitch in degrees
    pub pitch_range: (f64, f64),
    /// Tolerance added beyond the observed extremes
    #[serde(default = "default_margin_deg")]
    pub margin_deg: f64,
}

fn default_margin_deg() -> f64 {
    5.0
}

/// Calibrated bounds never go below or above these
const MIN_CALIBRATED_BOUND_DEG: f64 = 5.0;
const MAX_CALIBRATED_BOUND_DEG: f64 = 90.0;

impl CalibrationProfile {
    fn validate_range(name: &str, (min, max): (f64, f64)) -> Result<(), VigilError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(VigilError::InvalidConfig(format!(
                "{name} range ({min}, {max}) is not a finite increasing range"
            )));
        }
        Ok(())
    }

    /// (yaw_max, pitch_max) derived from the observed ranges
    pub fn bounds(&self) -> Result<(f64, f64), VigilError> {
        Self::validate_range("yaw", self.yaw_range)?;
        Self::validate_range("pitch", self.pitch_range)?;
        if !(self.margin_deg >= 0.0) {
            return Err(VigilError::InvalidConfig(format!(
                "calibration margin must be non-negative, got {}",
                self.margin_deg
            )));
        }

        let bound = |(min, max): (f64, f64)| {
            (min.abs().max(max.abs()) + self.margin_deg)
                .clamp(MIN_CALIBRATED_BOUND_DEG, MAX_CALIBRATED_BOUND_DEG)
        };
        Ok((bound(self.yaw_range), bound(self.pitch_range)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ChannelWeights::default().sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_update_renormalizes() {
        let update = WeightsUpdate {
            gaze: Some(0.8),
            ..Default::default()
        };
        let weights = ChannelWeights::default().merged(&update).unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        // 0.8 / (0.8 + 0.25 + 0.2 + 0.15)
        assert!((weights.gaze - 0.8 / 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_weights() {
        let negative = WeightsUpdate {
            temporal: Some(-0.1),
            ..Default::default()
        };
        assert!(matches!(
            ChannelWeights::default().merged(&negative),
            Err(VigilError::InvalidWeights(_))
        ));

        let zeros = ChannelWeights {
            gaze: 0.0,
            head_pose: 0.0,
            environment: 0.0,
            temporal: 0.0,
        };
        assert!(zeros.normalized().is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(ProcessorConfig::default().validated().is_ok());

        let mut config = ProcessorConfig::default();
        config.thresholds.lighting_min = 0.95;
        assert!(config.validated().is_err());

        let mut config = ProcessorConfig::default();
        config.temporal.min_history = 50;
        assert!(config.validated().is_err());

        let mut config = ProcessorConfig::default();
        config.temporal.history_size = 0;
        assert!(matches!(
            config.validated(),
            Err(VigilError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_calibration_bounds() {
        let profile = CalibrationProfile {
            yaw_range: (-22.0, 18.0),
            pitch_range: (-8.0, 12.0),
            margin_deg: 5.0,
        };
        let (yaw, pitch) = profile.bounds().unwrap();
        assert!((yaw - 27.0).abs() < 1e-12);
        assert!((pitch - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_bounds_are_clamped() {
        let profile = CalibrationProfile {
            yaw_range: (0.0, 0.0),
            pitch_range: (-170.0, 10.0),
            margin_deg: 0.0,
        };
        let (yaw, pitch) = profile.bounds().unwrap();
        assert_eq!(yaw, 5.0);
        assert_eq!(pitch, 90.0);
    }

    #[test]
    fn test_calibration_rejects_inverted_range() {
        let profile = CalibrationProfile {
            yaw_range: (10.0, -10.0),
            pitch_range: (-5.0, 5.0),
            margin_deg: 5.0,
        };
        assert!(profile.bounds().is_err());
    }
}
