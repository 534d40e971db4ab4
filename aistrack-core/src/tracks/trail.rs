//! Trail History
//!
//! Bounded per-track position history, newest last.

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

const INITIAL_CAPACITY: usize = 128;

/// A single point in a track's trail
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
}

/// Trail for a single track (ring buffer)
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<TrailPoint>,
    max_points: usize,
}

impl Trail {
    pub fn new(max_points: usize) -> Self {
        Trail {
            points: VecDeque::with_capacity(max_points.min(INITIAL_CAPACITY)),
            max_points,
        }
    }

    /// Append a point, evicting the oldest beyond capacity.
    ///
    /// A point carrying the same timestamp as the newest one replaces it, so a
    /// latitude and longitude delivered separately make a single point.
    pub fn add_point(&mut self, point: TrailPoint) {
        if let Some(last) = self.points.back_mut() {
            if last.timestamp == point.timestamp {
                *last = point;
                return;
            }
        }
        self.points.push_back(point);
        self.truncate();
    }

    pub(crate) fn set_max_points(&mut self, max_points: usize) {
        self.max_points = max_points;
        self.truncate();
    }

    fn truncate(&mut self) {
        while self.points.len() > self.max_points {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest retained point
    pub fn oldest(&self) -> Option<&TrailPoint> {
        self.points.front()
    }

    /// Newest point
    pub fn newest(&self) -> Option<&TrailPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }
}

impl Serialize for Trail {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.points.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: u64) -> TrailPoint {
        TrailPoint {
            latitude: timestamp as f64 / 1000.0,
            longitude: 0.0,
            timestamp,
        }
    }

    #[test]
    fn test_capacity() {
        let mut trail = Trail::new(3);
        for t in 1..=5 {
            trail.add_point(point(t));
        }
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.oldest().unwrap().timestamp, 3);
        assert_eq!(trail.newest().unwrap().timestamp, 5);
    }

    #[test]
    fn test_same_timestamp_replaces() {
        let mut trail = Trail::new(10);
        trail.add_point(point(1));
        trail.add_point(TrailPoint {
            latitude: 9.0,
            longitude: 9.0,
            timestamp: 1,
        });
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.newest().unwrap().latitude, 9.0);
    }

    #[test]
    fn test_shrink() {
        let mut trail = Trail::new(10);
        for t in 1..=10 {
            trail.add_point(point(t));
        }
        trail.set_max_points(4);
        assert_eq!(trail.len(), 4);
        assert_eq!(trail.oldest().unwrap().timestamp, 7);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut trail = Trail::new(usize::MAX / 2);
        trail.add_point(point(1));
        trail.add_point(point(2));
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut trail = Trail::new(2);
        trail.add_point(point(1000));
        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(json, serde_json::json!([{"latitude": 1.0, "longitude": 0.0, "timestamp": 1000}]));
    }
}
