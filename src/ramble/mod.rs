// SPDX-License-Identifier: GPL-3.0-only

//! Ramble: continuous-gesture key selection.
//!
//! In ramble mode the user drags the pointer across the keyboard instead of
//! clicking. [`Ramble`] follows the path and reports when the key under the
//! pointer should be selected. The coordinator then clicks that key exactly as
//! if the button had been pressed and released over it.
//!
//! Three detection algorithms are available:
//!
//! - [`RambleAlgorithm::Angle`]: a sharp turn in the path (more than
//!   `turn_threshold`, 30 degrees by default) selects the key under the
//!   corner. Samples closer than `min_angle_distance` to the previous
//!   angle-bearing sample carry no direction, which filters hand jitter.
//! - [`RambleAlgorithm::Time`]: staying over one key for `hold_ms` selects it,
//!   once per visit.
//! - [`RambleAlgorithm::Distance`]: the path travelled over one key, measured
//!   in multiples of the key size, selects it once it reaches
//!   `distance_threshold`. If the walk back along the path runs into a sample
//!   that already selected a key, `repeat_threshold` applies instead.
//!
//! The path is bounded by `max_points`; the oldest samples are dropped first.

pub mod path;

pub use path::{fold_angle, RamblePath, RamblePoint};

use crate::config::{RambleAlgorithm, RambleConfig};
use crate::keyboard::{Key, KeyId};
use std::time::Instant;

/// The key under a gesture sample, with the size used to scale distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RambleKey {
    /// Key id.
    pub id: KeyId,
    /// Key width in view pixels.
    pub width: f64,
    /// Key height in view pixels.
    pub height: f64,
}

impl RambleKey {
    pub fn new(id: KeyId, width: f64, height: f64) -> Self {
        Self { id, width, height }
    }
}

impl From<(KeyId, &Key)> for RambleKey {
    fn from((id, key): (KeyId, &Key)) -> Self {
        Self::new(id, key.width, key.height)
    }
}

/// Hold-to-select tracking for the time algorithm.
#[derive(Debug, Clone, Copy)]
struct Hold {
    key: KeyId,
    /// `None` once the key has fired for this visit.
    since: Option<Instant>,
}

/// Gesture recognizer.
#[derive(Debug, Clone)]
pub struct Ramble {
    config: RambleConfig,
    path: RamblePath,
    started: bool,
    hold: Option<Hold>,
    last_selected: Option<KeyId>,
}

impl Ramble {
    /// Creates an idle recognizer.
    pub fn new(config: RambleConfig) -> Self {
        let path = RamblePath::new(config.max_points, config.min_angle_distance);
        Self {
            config,
            path,
            started: false,
            hold: None,
            last_selected: None,
        }
    }

    /// Active settings.
    pub fn config(&self) -> &RambleConfig {
        &self.config
    }

    /// The current path.
    pub fn path(&self) -> &RamblePath {
        &self.path
    }

    /// Returns `true` once a gesture has been started.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Returns `true` if pointer motion currently feeds the gesture.
    ///
    /// Without `require_button`, every motion is part of a gesture.
    pub fn is_active(&self) -> bool {
        !self.config.require_button || self.started
    }

    /// Begins a new gesture at the given point, discarding any previous path.
    ///
    /// Returns `true` if `key` should be selected right away. With the angle
    /// and distance algorithms the key a gesture starts on is selected; with
    /// the time algorithm it only arms the hold timer.
    pub fn start(&mut self, x: f64, y: f64, key: Option<RambleKey>) -> bool {
        self.start_at(x, y, key, Instant::now())
    }

    /// [`start`](Self::start) with an explicit clock.
    pub fn start_at(&mut self, x: f64, y: f64, key: Option<RambleKey>, now: Instant) -> bool {
        let id = key.map(|k| k.id);
        self.path.clear();
        self.started = true;
        self.last_selected = None;
        self.hold = id.map(|key| Hold {
            key,
            since: Some(now),
        });
        self.path.push(x, y, id);

        let selected = match self.config.algorithm {
            RambleAlgorithm::Angle | RambleAlgorithm::Distance => id.is_some(),
            RambleAlgorithm::Time => false,
        };
        if selected {
            self.select(id);
        }
        tracing::debug!("Ramble started at ({}, {}) on {:?}", x, y, key);
        selected
    }

    /// Appends a sample. Returns `true` if the gesture selects the key under it.
    pub fn add_point(&mut self, x: f64, y: f64, key: Option<RambleKey>) -> bool {
        self.add_point_at(x, y, key, Instant::now())
    }

    /// [`add_point`](Self::add_point) with an explicit clock.
    pub fn add_point_at(&mut self, x: f64, y: f64, key: Option<RambleKey>, now: Instant) -> bool {
        if self.path.is_empty() {
            return self.start_at(x, y, key, now);
        }

        let id = key.map(|k| k.id);
        let velocity = self.path.push(x, y, id);
        let detected = match self.config.algorithm {
            RambleAlgorithm::Angle => velocity.is_some_and(|v| v > self.config.turn_threshold),
            RambleAlgorithm::Time => self.check_hold(id, now),
            RambleAlgorithm::Distance => key.is_some_and(|key| self.check_distance(key)),
        };

        if detected {
            tracing::debug!(
                "Ramble selection at ({}, {}) on {:?}, velocity {:?}",
                x,
                y,
                key,
                velocity
            );
            self.select(id);
        }
        detected
    }

    /// Ends the gesture and clears the path.
    ///
    /// Returns `true` if `key`, the key under the pointer when the gesture
    /// ends, was not the last selected one and should therefore be selected.
    pub fn reset(&mut self, key: Option<KeyId>) -> bool {
        let finalize = key.is_some() && key != self.last_selected;
        self.path.clear();
        self.started = false;
        self.hold = None;
        self.last_selected = None;
        finalize
    }

    fn select(&mut self, key: Option<KeyId>) {
        self.path.mark_selected();
        if key.is_some() {
            self.last_selected = key;
        }
    }

    /// Walks back over the samples on `key` that have not selected it yet and
    /// compares their length, in key sizes, against the threshold.
    fn check_distance(&self, key: RambleKey) -> bool {
        if !(key.width > 0.0 && key.height > 0.0) {
            return false;
        }
        let mut samples = self.path.iter().rev();
        let Some(newest) = samples.next() else {
            return false;
        };

        let (mut x, mut y) = (newest.x, newest.y);
        let mut travelled = 0.0;
        let mut repeat = false;
        for point in samples {
            if point.selected {
                repeat = true;
                break;
            }
            if point.key != Some(key.id) {
                break;
            }
            travelled += ((x - point.x) / key.width).hypot((y - point.y) / key.height);
            (x, y) = (point.x, point.y);
        }

        let threshold = if repeat {
            self.config.repeat_threshold
        } else {
            self.config.distance_threshold
        };
        travelled >= threshold
    }

    fn check_hold(&mut self, key: Option<KeyId>, now: Instant) -> bool {
        let Some(key) = key else {
            self.hold = None;
            return false;
        };
        match self.hold {
            Some(Hold { key: held, since }) if held == key => match since {
                Some(start) if now.duration_since(start) >= self.config.hold_duration() => {
                    self.hold = Some(Hold { key, since: None });
                    true
                }
                _ => false,
            },
            _ => {
                self.hold = Some(Hold {
                    key,
                    since: Some(now),
                });
                false
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
