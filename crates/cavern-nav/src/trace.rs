//! Movement traces for avatar trail rendering.

use std::collections::VecDeque;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Bounded trail of platform positions.
///
/// A point is recorded only once the platform has moved at least `spacing`
/// away from the newest point; the oldest points drop out past `capacity`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementTrace {
    points: VecDeque<Vector3<f64>>,
    capacity: usize,
    spacing: f64,
}

impl MovementTrace {
    /// Create an empty trace.
    #[must_use]
    pub fn new(capacity: usize, spacing: f64) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            spacing,
        }
    }

    /// Offer a position; returns whether it was recorded.
    pub fn record(&mut self, position: Vector3<f64>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if let Some(last) = self.points.back() {
            if (position - last).norm() < self.spacing {
                return false;
            }
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(position);
        true
    }

    /// Drop every point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Points from oldest to newest.
    pub fn points(&self) -> impl Iterator<Item = &Vector3<f64>> {
        self.points.iter()
    }

    /// Newest point.
    #[must_use]
    pub fn last(&self) -> Option<&Vector3<f64>> {
        self.points.back()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the trace holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_and_capacity() {
        let mut trace = MovementTrace::new(3, 0.5);

        assert!(trace.record(Vector3::zeros()));
        assert!(!trace.record(Vector3::new(0.2, 0.0, 0.0)));
        assert!(trace.record(Vector3::new(0.6, 0.0, 0.0)));
        assert!(trace.record(Vector3::new(1.2, 0.0, 0.0)));
        assert!(trace.record(Vector3::new(1.8, 0.0, 0.0)));

        assert_eq!(trace.len(), 3);
        assert!((trace.points().next().expect("oldest").x - 0.6).abs() < 1e-12);
        assert!((trace.last().expect("newest").x - 1.8).abs() < 1e-12);

        trace.clear();
        assert!(trace.is_empty());
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut trace = MovementTrace::new(0, 0.0);
        assert!(!trace.record(Vector3::zeros()));
        assert!(trace.is_empty());
    }
}
