//! Numeric smoothing primitives
//!
//! Each filter is a small, stateful, single-purpose building block:
//!
//! - [`KalmanFilter`] / [`VectorKalmanFilter`] - constant-value Kalman tracking
//! - [`Ema`] / [`VectorEma`] - exponential moving averages
//! - [`CircularBuffer`] - bounded history with rolling statistics
//! - [`OutlierDetector`] - Z-score + IQR spike rejection

pub mod buffer;
pub mod ema;
pub mod kalman;
pub mod outlier;

pub use buffer::CircularBuffer;
pub use ema::{Ema, VectorEma};
pub use kalman::{KalmanFilter, VectorKalmanFilter};
pub use outlier::{OutlierDetector, OutlierResult};
