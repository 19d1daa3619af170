// SPDX-License-Identifier: GPL-3.0-only

//! Key records.
//!
//! A [`Key`] is passive: it stores its identity, geometry, modifier metadata
//! and current [`KeyState`]. The state is only ever changed by the key state
//! machine in [`crate::fsm`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a key inside its [`Keyboard`](super::Keyboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub usize);

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a key.
///
/// Discriminants index the transition tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Not active. Initial state of every key.
    #[default]
    Released = 0,
    /// Held down.
    Pressed = 1,
    /// Active for the next normal keystroke only (modifiers).
    Latched = 2,
    /// Active until toggled off again.
    Locked = 3,
}

impl KeyState {
    /// Number of states, the innermost dimension of the transition tables.
    pub const COUNT: usize = 4;
}

/// Behavioural class of a key, derived from its modifier metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    /// A key without modifier mask.
    Normal = 0,
    /// A modifier that can latch and lock (Shift, Ctrl, AltGr).
    Modifier = 1,
    /// A modifier that only toggles between released and locked (Caps Lock).
    Locker = 2,
}

impl KeyClass {
    /// Number of classes.
    pub const COUNT: usize = 3;
}

/// A keyboard key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// Hardware key code, unique within a keyboard.
    pub code: u32,

    /// Label for logs and debugging. Glyph lookup happens elsewhere.
    #[serde(default)]
    pub label: String,

    /// Left edge in view coordinates.
    pub x: f64,
    /// Top edge in view coordinates.
    pub y: f64,
    /// Width in view coordinates.
    pub width: f64,
    /// Height in view coordinates.
    pub height: f64,

    /// Modifier bits contributed to the global mask while latched or locked.
    #[serde(default)]
    pub modifier: u32,

    /// Whether the key only toggles between released and locked.
    #[serde(default)]
    pub locker: bool,

    /// Whether the key drags the keyboard window. Such a key stays pressed
    /// across touch moves.
    #[serde(default)]
    pub moves_window: bool,

    #[serde(skip)]
    state: KeyState,
}

impl Key {
    /// Creates a normal key at the given rectangle.
    pub fn new(code: u32, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            code,
            label: String::new(),
            x,
            y,
            width,
            height,
            modifier: 0,
            locker: false,
            moves_window: false,
            state: KeyState::Released,
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Makes the key a modifier contributing `mask`.
    #[must_use]
    pub fn with_modifier(mut self, mask: u32) -> Self {
        self.modifier = mask;
        self
    }

    /// Makes the key a locker contributing `mask`.
    #[must_use]
    pub fn with_locker(mut self, mask: u32) -> Self {
        self.modifier = mask;
        self.locker = true;
        self
    }

    /// Marks the key as the window move key.
    #[must_use]
    pub fn with_moves_window(mut self) -> Self {
        self.moves_window = true;
        self
    }

    /// Current state.
    pub fn state(&self) -> KeyState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: KeyState) {
        self.state = state;
    }

    /// Derived behavioural class.
    pub fn class(&self) -> KeyClass {
        match (self.modifier, self.locker) {
            (0, _) => KeyClass::Normal,
            (_, false) => KeyClass::Modifier,
            (_, true) => KeyClass::Locker,
        }
    }

    /// Returns `true` for modifiers and lockers.
    pub fn is_modifier(&self) -> bool {
        self.class() != KeyClass::Normal
    }

    /// Returns `true` if the point lies inside the key rectangle.
    ///
    /// Left and top edges are inclusive, right and bottom edges exclusive, so
    /// adjacent keys never both claim a point.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Center of the key rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "key {}", self.code)
        } else {
            write!(f, "key {} ({})", self.code, self.label)
        }
    }
}
