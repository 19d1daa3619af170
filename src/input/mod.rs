// SPDX-License-Identifier: GPL-3.0-only

//! Input collaborators and modifier bookkeeping.
//!
//! The core talks to the outside world through two narrow traits:
//!
//! - [`KeyEmitter`] delivers synthetic key events to the focused application
//! - [`ViewNotifier`] asks the rendering layer to redraw
//!
//! Neither is ever read back; both calls are fire-and-forget.
//!
//! # Modules
//!
//! - `modifier`: latched/locked modifier sets and the global modifier mask
//! - `virtual_keyboard`: a [`KeyEmitter`] that queues events for the shell

pub mod modifier;
pub mod virtual_keyboard;

pub use modifier::ModifierState;
pub use virtual_keyboard::{keycodes, KeyDirection, KeyEvent, VirtualKeyboard};

use crate::keyboard::KeyId;

/// Delivers synthetic key events to the application that has text focus.
pub trait KeyEmitter {
    /// Sends a key-down (`pressed == true`) or key-up for a hardware code.
    fn emit(&mut self, code: u32, pressed: bool);

    /// Sends key-ups for anything still down. Called when the session resets.
    fn release_stuck(&mut self) {}
}

/// Receives redraw requests.
pub trait ViewNotifier {
    /// One key changed its appearance.
    fn notify_key_changed(&mut self, key: KeyId);

    /// The whole keyboard must be redrawn (e.g. the modifier mask changed).
    fn notify_view_changed(&mut self);
}

/// A view that only logs redraw requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceView;

impl ViewNotifier for TraceView {
    fn notify_key_changed(&mut self, key: KeyId) {
        tracing::trace!("Redraw key {}", key);
    }

    fn notify_view_changed(&mut self) {
        tracing::trace!("Redraw view");
    }
}

impl<T: KeyEmitter + ?Sized> KeyEmitter for &mut T {
    fn emit(&mut self, code: u32, pressed: bool) {
        (**self).emit(code, pressed);
    }

    fn release_stuck(&mut self) {
        (**self).release_stuck();
    }
}

impl<T: ViewNotifier + ?Sized> ViewNotifier for &mut T {
    fn notify_key_changed(&mut self, key: KeyId) {
        (**self).notify_key_changed(key);
    }

    fn notify_view_changed(&mut self) {
        (**self).notify_view_changed();
    }
}
