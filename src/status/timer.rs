// SPDX-License-Identifier: GPL-3.0-only

//! Dwell timer.
//!
//! Measures how long the pointer has rested on the focused key. The timer
//! does not schedule anything itself: the UI loop calls
//! [`Status::dwell_tick`](super::Status::dwell_tick) at a fixed interval and
//! the coordinator reads the progress.

use std::time::{Duration, Instant};

/// Elapsed-time tracker for dwell activation.
#[derive(Debug, Clone)]
pub struct DwellTimer {
    duration: Duration,
    started: Option<Instant>,
}

impl DwellTimer {
    /// Creates a stopped timer that completes after `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Starts the timer, or restarts it if it is already running.
    pub fn start_at(&mut self, now: Instant) {
        self.started = Some(now);
    }

    /// Stops the timer.
    pub fn stop(&mut self) {
        self.started = None;
    }

    /// Returns `true` while the timer runs.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Completion fraction in `[0.0, 1.0]`, or `None` when stopped.
    pub fn progress_at(&self, now: Instant) -> Option<f64> {
        let started = self.started?;
        if self.duration.is_zero() {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(started);
        Some((elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0))
    }
}
