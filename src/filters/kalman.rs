//! Constant-value Kalman filters
//!
//! Lightweight 1-D trackers for slowly drifting quantities (head angles, gaze
//! components). The vector form is a bank of independent scalar filters; there is
//! no cross-channel covariance.

use crate::error::VigilError;
use serde::{Deserialize, Serialize};

/// Default process-noise variance
pub const DEFAULT_PROCESS_NOISE: f64 = 0.01;
/// Default measurement-noise variance
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 0.1;
/// Error covariance assumed right after initialization
const INITIAL_ERROR_COVARIANCE: f64 = 1.0;

/// Scalar Kalman filter with a constant-value model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KalmanFilter {
    estimate: f64,
    error_covariance: f64,
    process_noise: f64,
    measurement_noise: f64,
    initialized: bool,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE)
    }
}

impl KalmanFilter {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            estimate: 0.0,
            error_covariance: INITIAL_ERROR_COVARIANCE,
            process_noise,
            measurement_noise,
            initialized: false,
        }
    }

    /// Fold in a measurement and return the new estimate.
    ///
    /// The first measurement seeds the estimate and is returned unchanged.
    pub fn update(&mut self, measurement: f64) -> f64 {
        if !self.initialized {
            self.estimate = measurement;
            self.error_covariance = INITIAL_ERROR_COVARIANCE;
            self.initialized = true;
            return measurement;
        }

        // Predict
        let predicted_covariance = self.error_covariance + self.process_noise;

        // Update
        let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance = (1.0 - gain) * predicted_covariance;

        self.estimate
    }

    /// Current estimate, `None` before the first measurement
    pub fn estimate(&self) -> Option<f64> {
        self.initialized.then_some(self.estimate)
    }

    pub fn error_covariance(&self) -> f64 {
        self.error_covariance
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_process_noise(&mut self, process_noise: f64) {
        self.process_noise = process_noise;
    }

    pub fn set_measurement_noise(&mut self, measurement_noise: f64) {
        self.measurement_noise = measurement_noise;
    }

    pub fn reset(&mut self) {
        self.estimate = 0.0;
        self.error_covariance = INITIAL_ERROR_COVARIANCE;
        self.initialized = false;
    }
}

/// Bank of independent scalar Kalman filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorKalmanFilter {
    filters: Vec<KalmanFilter>,
}

impl VectorKalmanFilter {
    pub fn new(dimension: usize, process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            filters: (0..dimension)
                .map(|_| KalmanFilter::new(process_noise, measurement_noise))
                .collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.filters.len()
    }

    /// Filter one measurement vector; its length must equal `dimension()`
    pub fn update(&mut self, measurement: &[f64]) -> Result<Vec<f64>, VigilError> {
        if measurement.len() != self.filters.len() {
            return Err(VigilError::DimensionMismatch {
                expected: self.filters.len(),
                actual: measurement.len(),
            });
        }
        Ok(self
            .filters
            .iter_mut()
            .zip(measurement)
            .map(|(filter, &value)| filter.update(value))
            .collect())
    }

    pub fn set_process_noise(&mut self, process_noise: f64) {
        for filter in &mut self.filters {
            filter.set_process_noise(process_noise);
        }
    }

    pub fn set_measurement_noise(&mut self, measurement_noise: f64) {
        for filter in &mut self.filters {
            filter.set_measurement_noise(measurement_noise);
        }
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}
