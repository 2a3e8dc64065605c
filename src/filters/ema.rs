//! Exponential moving averages

use crate::error::VigilError;
use serde::{Deserialize, Serialize};

fn validate_alpha(alpha: f64) -> Result<(), VigilError> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(VigilError::InvalidSmoothingFactor(alpha))
    }
}

/// Exponential moving average: `value = α·x + (1 − α)·value`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// `alpha` must lie in (0, 1]
    pub fn new(alpha: f64) -> Result<Self, VigilError> {
        validate_alpha(alpha)?;
        Ok(Self { alpha, value: None })
    }

    /// Fold in a sample; the first sample seeds the average
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * sample + (1.0 - self.alpha) * prev,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), VigilError> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Bank of independent EMAs sharing one smoothing factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEma {
    channels: Vec<Ema>,
}

impl VectorEma {
    pub fn new(dimension: usize, alpha: f64) -> Result<Self, VigilError> {
        validate_alpha(alpha)?;
        Ok(Self {
            channels: (0..dimension).map(|_| Ema { alpha, value: None }).collect(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.channels.len()
    }

    /// Smooth one sample vector; its length must equal `dimension()`
    pub fn update(&mut self, sample: &[f64]) -> Result<Vec<f64>, VigilError> {
        if sample.len() != self.channels.len() {
            return Err(VigilError::DimensionMismatch {
                expected: self.channels.len(),
                actual: sample.len(),
            });
        }
        Ok(self
            .channels
            .iter_mut()
            .zip(sample)
            .map(|(ema, &x)| ema.update(x))
            .collect())
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), VigilError> {
        validate_alpha(alpha)?;
        for ema in &mut self.channels {
            ema.alpha = alpha;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        for ema in &mut self.channels {
            ema.reset();
        }
    }
}
