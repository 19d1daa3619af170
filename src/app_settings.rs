// SPDX-License-Identifier: GPL-3.0-only

//! Centralized application settings and constants.

use std::f64::consts::PI;

/// Default dwell duration before the focused key is auto-activated, in milliseconds.
pub const DEFAULT_DWELL_MS: u64 = 1000;

/// Interval of the dwell timer tick on the UI loop, in milliseconds.
pub const DWELL_TICK_INTERVAL_MS: u64 = 50;

/// Interval at which queued hardware keyboard events are replayed, in milliseconds.
pub const SYNC_POLL_INTERVAL_MS: u64 = 100;

/// Maximum number of points kept in a ramble path.
pub const RAMBLE_MAX_POINTS: usize = 100;

/// Minimum distance in view pixels between two angle-bearing ramble points.
///
/// Motion shorter than this is treated as jitter and never changes direction.
pub const RAMBLE_MIN_ANGLE_DISTANCE: f64 = 5.0;

/// Angular velocity (radians) above which a ramble turn selects a key.
pub const RAMBLE_TURN_THRESHOLD: f64 = PI / 6.0;

/// Hold duration for the time-based ramble algorithm, in milliseconds.
pub const RAMBLE_HOLD_MS: u64 = 600;

/// Path length on one key, in key sizes, that selects it with the distance algorithm.
pub const RAMBLE_DISTANCE_THRESHOLD: f64 = 1.75;

/// Path length needed instead when the walk back reaches a point that already
/// selected its key, so that staying on a key repeats it less eagerly.
pub const RAMBLE_REPEAT_THRESHOLD: f64 = 2.5;
