// SPDX-License-Identifier: GPL-3.0-only

//! Hardware keyboard synchronisation queue.
//!
//! A recorder watching the physical keyboard runs on its own thread and pushes
//! [`ExternalKeyEvent`]s through a [`SyncSender`]. The UI loop never receives
//! them directly: it drains the [`SyncReceiver`] at a fixed interval (see
//! [`run_sync_replay`]) and replays each event as a `Pressed`/`Released` echo.
//!
//! Recorders must not forward the events the session emitted itself, or a
//! Caps Lock click would be toggled twice.

use super::Status;
use crate::input::{KeyEmitter, ViewNotifier};
use futures::channel::mpsc::{self, TryRecvError};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// A physical key change observed outside the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalKeyEvent {
    /// Hardware key code.
    pub code: u32,
    /// `true` for key-down, `false` for key-up.
    pub pressed: bool,
}

/// Sending half, owned by the recorder thread.
#[derive(Debug, Clone)]
pub struct SyncSender {
    tx: mpsc::UnboundedSender<ExternalKeyEvent>,
}

impl SyncSender {
    /// Queues an event. Returns `false` if the session is gone.
    pub fn send(&self, code: u32, pressed: bool) -> bool {
        self.tx
            .unbounded_send(ExternalKeyEvent { code, pressed })
            .is_ok()
    }
}

/// Receiving half, owned by the session.
#[derive(Debug)]
pub struct SyncReceiver {
    rx: mpsc::UnboundedReceiver<ExternalKeyEvent>,
    closed: bool,
}

impl SyncReceiver {
    /// Takes every queued event without waiting.
    pub fn drain(&mut self) -> Vec<ExternalKeyEvent> {
        let mut events = Vec::new();
        while !self.closed {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Closed) => {
                    tracing::info!("Hardware keyboard recorder disconnected");
                    self.closed = true;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        events
    }

    /// Returns `true` once every sender has been dropped and the queue is empty.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Creates a connected sender/receiver pair.
pub fn sync_channel() -> (SyncSender, SyncReceiver) {
    let (tx, rx) = mpsc::unbounded();
    (SyncSender { tx }, SyncReceiver { rx, closed: false })
}

/// Replays queued hardware events into `status` every `interval`.
///
/// Runs on the UI runtime until the recorder disconnects. The session is
/// borrowed only for the duration of each
/// [`Status::poll_external_events`] call, so pointer and timer handlers
/// sharing the same `Rc` run freely between ticks. Returns after the first
/// tick if no receiver is attached.
///
/// `interval` must be non-zero.
pub async fn run_sync_replay<E: KeyEmitter, V: ViewNotifier>(
    status: Rc<RefCell<Status<E, V>>>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut session = status.borrow_mut();
        session.poll_external_events();
        if !session.has_sync() {
            break;
        }
    }
}
