//! Single-frame spike rejection
//!
//! Combines a Z-score test and an IQR fence test over a rolling window. Both tests
//! compare the incoming value against the samples seen *before* it, so a spike
//! cannot mask itself by inflating the window statistics.

use crate::error::VigilError;
use crate::filters::buffer::CircularBuffer;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTLIER_WINDOW: usize = 10;
pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
/// Prior samples required before either test is trusted
pub const MIN_PRIOR_SAMPLES: usize = 4;

const EPSILON: f64 = 1e-9;

/// Outcome of testing one value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierResult {
    /// The value as received
    pub value: f64,
    pub is_outlier: bool,
    /// Strength of the detection (0-1), 0 when not an outlier
    pub confidence: f64,
    /// Z-score against the prior window (0 when not computed)
    pub z_score: f64,
    /// Value to use downstream: the prior window's median for outliers,
    /// otherwise the value itself
    pub filtered_value: f64,
}

/// Rolling Z-score + IQR outlier detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierDetector {
    window: CircularBuffer<f64>,
    z_threshold: f64,
    iqr_multiplier: f64,
}

impl OutlierDetector {
    pub fn new(window_size: usize) -> Result<Self, VigilError> {
        Self::with_thresholds(window_size, DEFAULT_Z_THRESHOLD, DEFAULT_IQR_MULTIPLIER)
    }

    pub fn with_thresholds(
        window_size: usize,
        z_threshold: f64,
        iqr_multiplier: f64,
    ) -> Result<Self, VigilError> {
        if !(z_threshold > 0.0) || !(iqr_multiplier > 0.0) {
            return Err(VigilError::InvalidConfig(format!(
                "outlier thresholds must be positive (z={z_threshold}, k={iqr_multiplier})"
            )));
        }
        Ok(Self {
            window: CircularBuffer::new(window_size)?,
            z_threshold,
            iqr_multiplier,
        })
    }

    /// Test `value` against the window, then add it to the window
    pub fn process(&mut self, value: f64) -> OutlierResult {
        let mut prior = self.window.to_vec();
        self.window.push(value);

        if prior.len() < MIN_PRIOR_SAMPLES {
            return OutlierResult {
                value,
                is_outlier: false,
                confidence: 0.0,
                z_score: 0.0,
                filtered_value: value,
            };
        }

        let (z_score, z_confidence) = self.z_test(&prior, value);

        prior.sort_by(|a, b| a.total_cmp(b));
        let iqr_confidence = self.iqr_test(&prior, value);

        let is_outlier = z_confidence > 0.0 || iqr_confidence > 0.0;
        let filtered_value = if is_outlier {
            percentile(&prior, 0.5)
        } else {
            value
        };

        OutlierResult {
            value,
            is_outlier,
            confidence: z_confidence.max(iqr_confidence).min(1.0),
            z_score,
            filtered_value,
        }
    }

    /// Returns (z-score, normalized exceedance), exceedance 0 when the test passes
    fn z_test(&self, prior: &[f64], value: f64) -> (f64, f64) {
        let n = prior.len() as f64;
        let mean = prior.iter().sum::<f64>() / n;
        let std_dev = (prior.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let deviation = (value - mean).abs();

        if std_dev < EPSILON {
            // Flat window: any visible departure is infinitely many sigmas out
            return if deviation > EPSILON {
                (f64::INFINITY, 1.0)
            } else {
                (0.0, 0.0)
            };
        }

        let z = deviation / std_dev;
        if z > self.z_threshold {
            (z, ((z - self.z_threshold) / self.z_threshold).min(1.0))
        } else {
            (z, 0.0)
        }
    }

    /// Normalized distance beyond the IQR fence, 0 inside the fence
    fn iqr_test(&self, sorted: &[f64], value: f64) -> f64 {
        let q1 = percentile(sorted, 0.25);
        let q3 = percentile(sorted, 0.75);
        let iqr = q3 - q1;
        let lower = q1 - self.iqr_multiplier * iqr;
        let upper = q3 + self.iqr_multiplier * iqr;

        let excess = if value < lower {
            lower - value
        } else if value > upper {
            value - upper
        } else {
            return 0.0;
        };
        if excess < EPSILON {
            return 0.0;
        }
        (excess / iqr.max(EPSILON)).min(1.0)
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            window: CircularBuffer::with_min_capacity(DEFAULT_OUTLIER_WINDOW),
            z_threshold: DEFAULT_Z_THRESHOLD,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

/// Linearly interpolated percentile of an ascending slice (`p` in 0-1)
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}
