// SPDX-License-Identifier: GPL-3.0-only

//! Modifier state management.
//!
//! This module tracks which modifier keys are latched and which are locked,
//! and derives the global modifier mask from them:
//!
//! - **Latched**: the modifier applies to the next normal keystroke only
//! - **Locked**: the modifier stays active until toggled off
//!
//! A key is in at most one of the two sets. Both sets keep insertion order, so
//! replaying them sends modifier key-downs in the order the user chose them.
//!
//! # Example
//!
//! ```rust,ignore
//! use latchboard::input::ModifierState;
//! use latchboard::keyboard::KeyId;
//!
//! let mut state = ModifierState::new();
//! state.latch(KeyId(0), 0x1);
//! assert_eq!(state.mask(), 0x1);
//!
//! // ... a normal key is typed ...
//! state.clear_latched();
//! assert_eq!(state.mask(), 0);
//! ```

use crate::keyboard::KeyId;

/// Latched and locked modifier keys with their masks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Latched keys with their masks, in latch order.
    latched: Vec<(KeyId, u32)>,

    /// Locked keys with their masks, in lock order.
    locked: Vec<(KeyId, u32)>,

    /// OR of every mask in both sets.
    mask: u32,
}

impl ModifierState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches a key. A locked key moves to the latched set.
    pub fn latch(&mut self, key: KeyId, mask: u32) {
        remove(&mut self.locked, key);
        if !contains(&self.latched, key) {
            self.latched.push((key, mask));
        }
        self.recompute();
    }

    /// Removes a key from the latched set. No-op if it is not latched.
    pub fn unlatch(&mut self, key: KeyId) {
        if remove(&mut self.latched, key) {
            self.recompute();
        }
    }

    /// Locks a key. A latched key moves to the locked set.
    pub fn lock(&mut self, key: KeyId, mask: u32) {
        remove(&mut self.latched, key);
        if !contains(&self.locked, key) {
            self.locked.push((key, mask));
        }
        self.recompute();
    }

    /// Removes a key from the locked set. No-op if it is not locked.
    pub fn unlock(&mut self, key: KeyId) {
        if remove(&mut self.locked, key) {
            self.recompute();
        }
    }

    /// Empties the latched set and returns the keys it held, in latch order.
    pub fn clear_latched(&mut self) -> Vec<KeyId> {
        let cleared = self.latched.drain(..).map(|(key, _)| key).collect();
        self.recompute();
        cleared
    }

    /// Empties both sets.
    pub fn clear_all(&mut self) {
        self.latched.clear();
        self.locked.clear();
        self.mask = 0;
    }

    /// Global modifier mask.
    #[must_use]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Returns `true` if the key is latched.
    #[must_use]
    pub fn is_latched(&self, key: KeyId) -> bool {
        contains(&self.latched, key)
    }

    /// Returns `true` if the key is locked.
    #[must_use]
    pub fn is_locked(&self, key: KeyId) -> bool {
        contains(&self.locked, key)
    }

    /// Latched keys in latch order.
    pub fn latched(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.latched.iter().map(|(key, _)| *key)
    }

    /// Locked keys in lock order.
    pub fn locked(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.locked.iter().map(|(key, _)| *key)
    }

    /// Latched keys followed by locked keys.
    pub fn active(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.latched().chain(self.locked())
    }

    /// Returns `true` if any modifier is latched or locked.
    #[must_use]
    pub fn has_active_modifiers(&self) -> bool {
        !self.latched.is_empty() || !self.locked.is_empty()
    }

    fn recompute(&mut self) {
        self.mask = self
            .latched
            .iter()
            .chain(self.locked.iter())
            .fold(0, |acc, (_, mask)| acc | mask);
    }
}

fn contains(set: &[(KeyId, u32)], key: KeyId) -> bool {
    set.iter().any(|(k, _)| *k == key)
}

fn remove(set: &mut Vec<(KeyId, u32)>, key: KeyId) -> bool {
    let before = set.len();
    set.retain(|(k, _)| *k != key);
    set.len() != before
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_unlatch() {
        let mut state = ModifierState::new();

        state.latch(KeyId(0), 0x1);
        assert!(state.is_latched(KeyId(0)));
        assert_eq!(state.mask(), 0x1);

        state.unlatch(KeyId(0));
        assert!(!state.is_latched(KeyId(0)));
        assert_eq!(state.mask(), 0);
    }

    /// Unlatching a key that is not latched changes nothing.
    #[test]
    fn test_unlatch_is_idempotent() {
        let mut state = ModifierState::new();
        state.latch(KeyId(1), 0x4);
        state.lock(KeyId(2), 0x2);
        let before = state.clone();

        state.unlatch(KeyId(7));
        state.unlatch(KeyId(2));
        assert_eq!(state, before);
        assert_eq!(state.mask(), 0x6);
    }

    /// A key moves between the sets rather than sitting in both.
    #[test]
    fn test_key_in_one_set_only() {
        let mut state = ModifierState::new();

        state.latch(KeyId(0), 0x1);
        state.lock(KeyId(0), 0x1);
        assert!(!state.is_latched(KeyId(0)));
        assert!(state.is_locked(KeyId(0)));

        state.latch(KeyId(0), 0x1);
        assert!(state.is_latched(KeyId(0)));
        assert!(!state.is_locked(KeyId(0)));
        assert_eq!(state.active().count(), 1);
    }

    /// The mask stays the OR over both sets across every change.
    #[test]
    fn test_mask_is_union() {
        let mut state = ModifierState::new();
        state.latch(KeyId(0), 0x1);
        state.latch(KeyId(1), 0x4);
        state.lock(KeyId(2), 0x2);
        assert_eq!(state.mask(), 0x7);

        let cleared = state.clear_latched();
        assert_eq!(cleared, vec![KeyId(0), KeyId(1)]);
        assert_eq!(state.mask(), 0x2);

        state.unlock(KeyId(2));
        assert_eq!(state.mask(), 0);
        assert!(!state.has_active_modifiers());
    }

    /// Two keys sharing a mask keep it set until both are gone.
    #[test]
    fn test_shared_mask() {
        let mut state = ModifierState::new();
        state.latch(KeyId(0), 0x1);
        state.lock(KeyId(1), 0x1);

        state.unlatch(KeyId(0));
        assert_eq!(state.mask(), 0x1);
        state.unlock(KeyId(1));
        assert_eq!(state.mask(), 0);
    }

    #[test]
    fn test_active_order() {
        let mut state = ModifierState::new();
        state.lock(KeyId(5), 0x2);
        state.latch(KeyId(3), 0x1);
        state.latch(KeyId(1), 0x8);

        let active: Vec<KeyId> = state.active().collect();
        assert_eq!(active, vec![KeyId(3), KeyId(1), KeyId(5)]);
    }

    #[test]
    fn test_clear_all() {
        let mut state = ModifierState::new();
        state.latch(KeyId(0), 0x1);
        state.lock(KeyId(1), 0x2);
        state.clear_all();
        assert_eq!(state, ModifierState::default());
    }
}
