//! Temporal filtering of raw frames
//!
//! Turns each [`RawSignalFrame`] into a smoothed [`SignalBundle`] and attaches
//! per-channel stability metrics:
//! - Head yaw/pitch: outlier rejection → Kalman
//! - Gaze vector: Kalman (only above the confidence noise floor)
//! - Environment: EMA
//! - Stability: 1 − rolling standard deviation / channel scale

use crate::error::VigilError;
use crate::filters::{CircularBuffer, OutlierDetector, VectorEma, VectorKalmanFilter};
use crate::types::{ChannelStability, EnvironmentReading, GazeVector, HeadPose, RawSignalFrame, SignalBundle};
use serde::{Deserialize, Serialize};

/// Gaze angle standard deviation (degrees) at which gaze stability reaches 0
const GAZE_STABILITY_SCALE_DEG: f64 = 15.0;
/// Head angle standard deviation (degrees) at which head stability reaches 0
const HEAD_STABILITY_SCALE_DEG: f64 = 20.0;
/// Lighting standard deviation at which lighting stability reaches 0
const LIGHTING_STABILITY_SCALE: f64 = 0.2;

/// Temporal filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalFilterConfig {
    /// Kalman process-noise variance for head pose and gaze
    pub process_noise: f64,
    /// Kalman measurement-noise variance for head pose and gaze
    pub measurement_noise: f64,
    /// EMA smoothing factor for environment readings
    pub environment_alpha: f64,
    /// Samples used for stability metrics
    pub stability_window: usize,
    /// Samples used for head-angle spike rejection
    pub outlier_window: usize,
    /// Gaze confidence at or below which the gaze vector is not filtered
    pub noise_floor: f64,
}

impl Default for TemporalFilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 0.1,
            environment_alpha: 0.3,
            stability_window: 10,
            outlier_window: 10,
            noise_floor: 0.1,
        }
    }
}

impl TemporalFilterConfig {
    pub fn validate(&self) -> Result<(), VigilError> {
        if !(self.process_noise >= 0.0) || !(self.measurement_noise > 0.0) {
            return Err(VigilError::InvalidConfig(
                "kalman noise variances must be non-negative (measurement noise > 0)".to_string(),
            ));
        }
        if !(self.environment_alpha > 0.0 && self.environment_alpha <= 1.0) {
            return Err(VigilError::InvalidSmoothingFactor(self.environment_alpha));
        }
        if self.stability_window == 0 {
            return Err(VigilError::InvalidCapacity(self.stability_window));
        }
        if self.outlier_window == 0 {
            return Err(VigilError::InvalidCapacity(self.outlier_window));
        }
        Ok(())
    }
}

/// Stateful per-session frame filter
#[derive(Debug, Clone)]
pub struct TemporalFilterSystem {
    config: TemporalFilterConfig,
    head_filter: VectorKalmanFilter,
    gaze_filter: VectorKalmanFilter,
    environment_filter: VectorEma,
    yaw_outliers: OutlierDetector,
    pitch_outliers: OutlierDetector,
    gaze_angles: CircularBuffer<f64>,
    yaw_history: CircularBuffer<f64>,
    pitch_history: CircularBuffer<f64>,
    lighting_history: CircularBuffer<f64>,
    last_stability: ChannelStability,
    frames_filtered: u64,
    spikes_rejected: u64,
}

impl TemporalFilterSystem {
    pub fn new(config: TemporalFilterConfig) -> Result<Self, VigilError> {
        config.validate()?;
        Ok(Self {
            head_filter: VectorKalmanFilter::new(3, config.process_noise, config.measurement_noise),
            gaze_filter: VectorKalmanFilter::new(3, config.process_noise, config.measurement_noise),
            environment_filter: VectorEma::new(4, config.environment_alpha)?,
            yaw_outliers: OutlierDetector::new(config.outlier_window)?,
            pitch_outliers: OutlierDetector::new(config.outlier_window)?,
            gaze_angles: CircularBuffer::new(config.stability_window)?,
            yaw_history: CircularBuffer::new(config.stability_window)?,
            pitch_history: CircularBuffer::new(config.stability_window)?,
            lighting_history: CircularBuffer::new(config.stability_window)?,
            last_stability: ChannelStability::default(),
            frames_filtered: 0,
            spikes_rejected: 0,
            config,
        })
    }

    /// Filter one raw frame.
    ///
    /// Frames without a detected face leave all filter state untouched and carry the
    /// last known stability values.
    pub fn filter(&mut self, frame: &RawSignalFrame) -> Result<SignalBundle, VigilError> {
        if !frame.face_detected {
            return Ok(SignalBundle {
                timestamp: frame.timestamp,
                face_detected: false,
                head_pose: frame.head_pose,
                gaze: frame.gaze,
                environment: frame.environment,
                stability: self.last_stability,
            });
        }

        let head_pose = self.filter_head_pose(&frame.head_pose)?;
        let gaze = self.filter_gaze(&frame.gaze)?;
        let environment = self.filter_environment(&frame.environment)?;

        self.yaw_history.push(head_pose.yaw);
        self.pitch_history.push(head_pose.pitch);
        self.lighting_history.push(environment.lighting);

        let head_stability = (stability_from(&self.yaw_history, HEAD_STABILITY_SCALE_DEG)
            + stability_from(&self.pitch_history, HEAD_STABILITY_SCALE_DEG))
            / 2.0;
        let stability = ChannelStability {
            gaze: stability_from(&self.gaze_angles, GAZE_STABILITY_SCALE_DEG),
            head_pose: head_stability,
            lighting: stability_from(&self.lighting_history, LIGHTING_STABILITY_SCALE),
        };
        self.last_stability = stability;
        self.frames_filtered += 1;

        Ok(SignalBundle {
            timestamp: frame.timestamp,
            face_detected: true,
            head_pose,
            gaze,
            environment,
            stability,
        })
    }

    fn filter_head_pose(&mut self, raw: &HeadPose) -> Result<HeadPose, VigilError> {
        let yaw = self.yaw_outliers.process(raw.yaw);
        let pitch = self.pitch_outliers.process(raw.pitch);
        if yaw.is_outlier || pitch.is_outlier {
            self.spikes_rejected += 1;
            log::debug!(
                "rejected head pose spike (yaw {:.1}°, pitch {:.1}°)",
                raw.yaw,
                raw.pitch
            );
        }

        let smoothed = self
            .head_filter
            .update(&[yaw.filtered_value, pitch.filtered_value, raw.roll])?;
        Ok(HeadPose {
            yaw: smoothed[0],
            pitch: smoothed[1],
            roll: smoothed[2],
            confidence: raw.confidence,
        })
    }

    fn filter_gaze(&mut self, raw: &GazeVector) -> Result<GazeVector, VigilError> {
        if raw.confidence <= self.config.noise_floor {
            return Ok(*raw);
        }
        let smoothed = self.gaze_filter.update(&[raw.x, raw.y, raw.z])?;
        let gaze = GazeVector {
            x: smoothed[0],
            y: smoothed[1],
            z: smoothed[2],
            confidence: raw.confidence,
        };
        self.gaze_angles.push(gaze.angle_from_forward_deg());
        Ok(gaze)
    }

    fn filter_environment(
        &mut self,
        raw: &EnvironmentReading,
    ) -> Result<EnvironmentReading, VigilError> {
        let smoothed = self.environment_filter.update(&[
            raw.lighting,
            raw.shadow_stability,
            raw.secondary_face,
            raw.device_object,
        ])?;
        Ok(EnvironmentReading {
            lighting: smoothed[0].clamp(0.0, 1.0),
            shadow_stability: smoothed[1].clamp(0.0, 1.0),
            secondary_face: smoothed[2].clamp(0.0, 1.0),
            device_object: smoothed[3].clamp(0.0, 1.0),
        })
    }

    pub fn config(&self) -> &TemporalFilterConfig {
        &self.config
    }

    /// Frames that went through the filters (face detected)
    pub fn frames_filtered(&self) -> u64 {
        self.frames_filtered
    }

    /// Frames whose head yaw or pitch was replaced by the window median
    pub fn spikes_rejected(&self) -> u64 {
        self.spikes_rejected
    }

    pub fn reset(&mut self) {
        self.head_filter.reset();
        self.gaze_filter.reset();
        self.environment_filter.reset();
        self.yaw_outliers.reset();
        self.pitch_outliers.reset();
        self.gaze_angles.clear();
        self.yaw_history.clear();
        self.pitch_history.clear();
        self.lighting_history.clear();
        self.last_stability = ChannelStability::default();
        self.frames_filtered = 0;
        self.spikes_rejected = 0;
    }
}

/// `1 − std/scale` clamped to 0-1; fewer than two samples count as fully stable
fn stability_from(buffer: &CircularBuffer<f64>, scale: f64) -> f64 {
    if buffer.len() < 2 {
        return 1.0;
    }
    (1.0 - buffer.standard_deviation() / scale).clamp(0.0, 1.0)
}
