// SPDX-License-Identifier: GPL-3.0-only

//! Queueing synthetic keyboard.
//!
//! [`VirtualKeyboard`] implements [`KeyEmitter`] by queueing [`KeyEvent`]s.
//! The embedding shell drains the queue with [`VirtualKeyboard::take_pending_events`]
//! and forwards the events to whatever injection API it uses (a virtual
//! keyboard protocol, an accessibility event API, ...). The core never needs
//! to know which.
//!
//! The keyboard also remembers which codes are down on the wire, so that a
//! session reset can send the key-ups that would otherwise leave keys stuck
//! in the focused application.
//!
//! # Example
//!
//! ```rust,ignore
//! use latchboard::input::{KeyEmitter, VirtualKeyboard};
//!
//! let mut vk = VirtualKeyboard::new();
//! vk.emit(keycodes::KEY_LEFTSHIFT, true);
//! vk.emit(30, true);
//! vk.emit(30, false);
//! vk.emit(keycodes::KEY_LEFTSHIFT, false);
//!
//! for event in vk.take_pending_events() {
//!     forward(event);
//! }
//! ```

use super::KeyEmitter;
use std::time::Instant;

/// Direction of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// Key went down.
    Pressed,
    /// Key went up.
    Released,
}

/// A synthetic key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The hardware keycode.
    pub keycode: u32,
    /// Whether the key was pressed or released.
    pub direction: KeyDirection,
    /// Milliseconds since the keyboard was created.
    pub time: u32,
}

impl KeyEvent {
    /// Creates a new key press event.
    #[must_use]
    pub fn press(keycode: u32, time: u32) -> Self {
        Self {
            keycode,
            direction: KeyDirection::Pressed,
            time,
        }
    }

    /// Creates a new key release event.
    #[must_use]
    pub fn release(keycode: u32, time: u32) -> Self {
        Self {
            keycode,
            direction: KeyDirection::Released,
            time,
        }
    }

    /// Returns `true` for a press event.
    #[must_use]
    pub fn is_press(&self) -> bool {
        self.direction == KeyDirection::Pressed
    }
}

/// Synthetic keyboard that queues events for the embedding shell.
#[derive(Debug)]
pub struct VirtualKeyboard {
    /// Pending key events waiting to be taken.
    pending_events: Vec<KeyEvent>,

    /// Codes currently down on the wire, in press order.
    held: Vec<u32>,

    /// Time origin for event timestamps.
    epoch: Instant,
}

impl Default for VirtualKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualKeyboard {
    /// Creates an empty virtual keyboard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending_events: Vec::new(),
            held: Vec::new(),
            epoch: Instant::now(),
        }
    }

    /// Queues a key press event.
    pub fn press_key(&mut self, keycode: u32) {
        if self.held.contains(&keycode) {
            tracing::debug!("Keycode {} pressed while already down", keycode);
        } else {
            self.held.push(keycode);
        }
        let event = KeyEvent::press(keycode, self.get_timestamp());
        self.pending_events.push(event);
        tracing::debug!("Queued key press: keycode={}", keycode);
    }

    /// Queues a key release event.
    pub fn release_key(&mut self, keycode: u32) {
        match self.held.iter().position(|&code| code == keycode) {
            Some(index) => {
                self.held.remove(index);
            }
            None => tracing::debug!("Keycode {} released while not down", keycode),
        }
        let event = KeyEvent::release(keycode, self.get_timestamp());
        self.pending_events.push(event);
        tracing::debug!("Queued key release: keycode={}", keycode);
    }

    /// Queues key-ups for every code still down, most recent first.
    pub fn release_all(&mut self) {
        while let Some(&keycode) = self.held.last() {
            self.release_key(keycode);
        }
    }

    /// Codes currently down, in press order.
    #[must_use]
    pub fn held_keys(&self) -> &[u32] {
        &self.held
    }

    /// Returns the pending key events and clears the queue.
    #[must_use]
    pub fn take_pending_events(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Returns a reference to the pending key events without clearing.
    #[must_use]
    pub fn pending_events(&self) -> &[KeyEvent] {
        &self.pending_events
    }

    /// Clears all pending key events.
    pub fn clear_pending_events(&mut self) {
        self.pending_events.clear();
    }

    fn get_timestamp(&self) -> u32 {
        (self.epoch.elapsed().as_millis() % u128::from(u32::MAX)) as u32
    }
}

impl KeyEmitter for VirtualKeyboard {
    fn emit(&mut self, code: u32, pressed: bool) {
        if pressed {
            self.press_key(code);
        } else {
            self.release_key(code);
        }
    }

    fn release_stuck(&mut self) {
        self.release_all();
    }
}

// ============================================================================
// Common Keycodes (evdev)
// ============================================================================

/// Evdev codes used by the bundled layouts and tests.
pub mod keycodes {
    /// Tab key
    pub const KEY_TAB: u32 = 15;
    /// Enter/Return key
    pub const KEY_ENTER: u32 = 28;
    /// Left Control key
    pub const KEY_LEFTCTRL: u32 = 29;
    /// A key
    pub const KEY_A: u32 = 30;
    /// S key
    pub const KEY_S: u32 = 31;
    /// D key
    pub const KEY_D: u32 = 32;
    /// Left Shift key
    pub const KEY_LEFTSHIFT: u32 = 42;
    /// Left Alt key
    pub const KEY_LEFTALT: u32 = 56;
    /// Space key
    pub const KEY_SPACE: u32 = 57;
    /// Caps Lock key
    pub const KEY_CAPSLOCK: u32 = 58;
}

// ============================================================================
// Unit Tests
// ============================================================================
