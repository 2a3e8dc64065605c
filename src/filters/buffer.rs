//! Fixed-capacity circular buffer with rolling statistics

use crate::error::VigilError;
use serde::{Deserialize, Serialize};
use std::collections::{vec_deque, VecDeque};

/// Fixed-capacity FIFO that overwrites its oldest entry once full.
///
/// Indexing runs from 0 (oldest) to `len() - 1` (newest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    /// Create an empty buffer; `capacity` must be non-zero
    pub fn new(capacity: usize) -> Result<Self, VigilError> {
        if capacity == 0 {
            return Err(VigilError::InvalidCapacity(capacity));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Infallible constructor for compile-time capacities; zero is raised to one
    pub(crate) fn with_min_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, evicting the oldest when full
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Item at `index` (0 = oldest), or `None` when out of range
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Most recently pushed item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// The newest `n` items, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> CircularBuffer<T> {
    /// Copy of the contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Copy + Into<f64>> CircularBuffer<T> {
    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.items.iter().map(|&v| v.into())
    }

    /// Arithmetic mean, 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.values().sum::<f64>() / self.items.len() as f64
    }

    /// Population variance, 0.0 when empty
    pub fn variance(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.values().map(|v| (v - mean).powi(2)).sum::<f64>() / self.items.len() as f64
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.values().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = CircularBuffer::<f64>::new(0);
        assert!(matches!(result, Err(VigilError::InvalidCapacity(0))));
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        for capacity in 1..6 {
            let mut buffer = CircularBuffer::new(capacity).unwrap();
            for extra in 0..4 {
                let total = capacity + extra;
                buffer.clear();
                for i in 0..total {
                    buffer.push(i as f64);
                }
                assert_eq!(buffer.len(), capacity);
                let expected: Vec<f64> = (extra..total).map(|i| i as f64).collect();
                assert_eq!(buffer.to_vec(), expected);
            }
        }
    }

    #[test]
    fn test_iter_is_cloneable() {
        let mut buffer = CircularBuffer::new(4).unwrap();
        for v in [1.0, 2.0, 3.0] {
            buffer.push(v);
        }
        let doubled = buffer.iter().map(|v| v * 2.0);
        assert_eq!(doubled.clone().count(), 3);
        assert_eq!(doubled.sum::<f64>(), 12.0);
        assert_eq!(buffer.iter().rev().next(), Some(&3.0));
    }

    #[test]
    fn test_get_indexes_oldest_first() {
        let mut buffer = CircularBuffer::new(3).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            buffer.push(v);
        }
        assert_eq!(buffer.get(0), Some(&2.0));
        assert_eq!(buffer.get(2), Some(&4.0));
        assert_eq!(buffer.get(3), None);
        assert_eq!(buffer.latest(), Some(&4.0));
    }

    #[test]
    fn test_statistics() {
        let mut buffer = CircularBuffer::new(10).unwrap();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            buffer.push(v);
        }
        assert!((buffer.mean() - 5.0).abs() < 1e-12);
        assert!((buffer.variance() - 4.0).abs() < 1e-12);
        assert!((buffer.standard_deviation() - 2.0).abs() < 1e-12);
        assert_eq!(buffer.min(), Some(2.0));
        assert_eq!(buffer.max(), Some(9.0));
    }

    #[test]
    fn test_empty_statistics_do_not_panic() {
        let buffer = CircularBuffer::<f64>::new(4).unwrap();
        assert_eq!(buffer.mean(), 0.0);
        assert_eq!(buffer.variance(), 0.0);
        assert_eq!(buffer.standard_deviation(), 0.0);
        assert_eq!(buffer.min(), None);
        assert_eq!(buffer.max(), None);
    }

    #[test]
    fn test_recent_window() {
        let mut buffer = CircularBuffer::new(5).unwrap();
        for v in 1..=5u32 {
            buffer.push(v);
        }
        let recent: Vec<u32> = buffer.recent(2).copied().collect();
        assert_eq!(recent, vec![4, 5]);
        let all: Vec<u32> = buffer.recent(10).copied().collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }
}
