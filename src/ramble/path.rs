// SPDX-License-Identifier: GPL-3.0-only

//! Bounded gesture path.

use crate::keyboard::KeyId;
use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

/// One sample of the pointer path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RamblePoint {
    /// Horizontal position in view pixels.
    pub x: f64,
    /// Vertical position in view pixels.
    pub y: f64,
    /// Direction from the previous angle-bearing point, in radians.
    pub angle: f64,
    /// Whether `angle` is meaningful.
    pub angle_is_set: bool,
    /// Key under the point when it was sampled.
    pub key: Option<KeyId>,
    /// Whether this sample selected its key.
    pub selected: bool,
}

impl RamblePoint {
    fn new(x: f64, y: f64, key: Option<KeyId>) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            angle_is_set: false,
            key,
            selected: false,
        }
    }
}

/// Insertion-ordered ring of path samples.
///
/// Direction tracking survives eviction: the reference point and the last
/// angle are kept outside the ring.
#[derive(Debug, Clone)]
pub struct RamblePath {
    points: VecDeque<RamblePoint>,
    capacity: usize,
    min_distance: f64,
    /// Last angle-bearing point, or the path start.
    anchor: Option<(f64, f64)>,
    /// Angle of the last angle-bearing point.
    last_angle: Option<f64>,
}

impl RamblePath {
    /// Creates an empty path holding at most `capacity` points.
    pub fn new(capacity: usize, min_distance: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            min_distance,
            anchor: None,
            last_angle: None,
        }
    }

    /// Appends a sample, evicting the oldest one when full.
    ///
    /// Returns the angular velocity folded into `[0, pi]` when the new point
    /// and the previous angle-bearing point both carry an angle.
    pub fn push(&mut self, x: f64, y: f64, key: Option<KeyId>) -> Option<f64> {
        let mut point = RamblePoint::new(x, y, key);
        let mut velocity = None;

        match self.anchor {
            None => self.anchor = Some((x, y)),
            Some((ax, ay)) => {
                let (dx, dy) = (x - ax, y - ay);
                if dx.hypot(dy) >= self.min_distance {
                    point.angle = dy.atan2(dx);
                    point.angle_is_set = true;
                    velocity = self.last_angle.map(|prev| fold_angle(point.angle - prev));
                    self.last_angle = Some(point.angle);
                    self.anchor = Some((x, y));
                }
            }
        }

        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        velocity
    }

    /// Marks the newest sample as having selected its key.
    pub fn mark_selected(&mut self) {
        if let Some(last) = self.points.back_mut() {
            last.selected = true;
        }
    }

    /// Newest sample.
    pub fn last(&self) -> Option<&RamblePoint> {
        self.points.back()
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RamblePoint> {
        self.points.iter()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the path has no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops every sample and the direction history.
    pub fn clear(&mut self) {
        self.points.clear();
        self.anchor = None;
        self.last_angle = None;
    }
}

/// Folds an angle difference into `[0, pi]`.
pub fn fold_angle(delta: f64) -> f64 {
    let d = delta.abs() % TAU;
    if d > PI { TAU - d } else { d }
}
