// SPDX-License-Identifier: GPL-3.0-only

//! Latchboard - input core of an on-screen keyboard
//!
//! This crate decides what happens when a key of an on-screen keyboard is
//! clicked, tapped, dwelled on or swept over, and which synthetic key events
//! reach the focused application as a result.
//!
//! # Architecture
//!
//! The core consists of three parts:
//!
//! 1. **Key state machine** (`fsm`): static transition tables mapping an
//!    event, key class and key state to the next state and a list of actions.
//!
//! 2. **Session coordinator** (`status`): owns the keys, focus, pressed key,
//!    modifiers and input method, and turns pointer events into state
//!    machine events.
//!
//! 3. **Ramble recognizer** (`ramble`): selects keys from a continuous
//!    pointer sweep instead of clicks.
//!
//! Rendering, window management and the actual input injection live outside
//! the core behind the traits in `input`.
//!
//! # Modules
//!
//! - `app_settings`: Centralized constants and defaults
//! - `config`: Session configuration loaded from JSON
//! - `fsm`: Key state machine and transition tables
//! - `input`: Emitter and view traits, modifier bookkeeping, virtual keyboard
//! - `keyboard`: Keys and the layout collaborator
//! - `ramble`: Gesture path and key selection
//! - `status`: Session coordinator, dwell timer and hardware keyboard sync

pub mod app_settings;
pub mod config;
pub mod fsm;
pub mod input;
pub mod keyboard;
pub mod ramble;
pub mod status;

pub use config::{Config, ConfigError, InputMethod};
pub use keyboard::{Key, KeyId, Keyboard, LayoutError};
pub use status::Status;

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod integration_tests {
    use crate::config::{Config, InputMethod};
    use crate::input::{keycodes, TraceView, VirtualKeyboard};
    use crate::keyboard::{Key, KeyId, KeyState, Keyboard};
    use crate::ramble::Ramble;
    use crate::status::{sync_channel, Status};

    const LAYOUT: &str = r#"[
        { "code": 42, "label": "Shift", "x": 0, "y": 40, "width": 60, "height": 40, "modifier": 1 },
        { "code": 58, "label": "Caps", "x": 60, "y": 40, "width": 60, "height": 40, "modifier": 2, "locker": true },
        { "code": 30, "label": "a", "x": 0, "y": 0, "width": 40, "height": 40 },
        { "code": 31, "label": "s", "x": 40, "y": 0, "width": 40, "height": 40 }
    ]"#;

    const SHIFT: KeyId = KeyId(0);
    const CAPS: KeyId = KeyId(1);
    const A: KeyId = KeyId(2);

    fn session(method: InputMethod) -> Status<VirtualKeyboard, TraceView> {
        let keyboard = Keyboard::from_json_str(LAYOUT).unwrap();
        let config = Config {
            input_method: method,
            ..Config::default()
        };
        Status::new(keyboard, VirtualKeyboard::new(), TraceView, &config)
    }

    fn events(status: &mut Status<VirtualKeyboard, TraceView>) -> Vec<(u32, bool)> {
        status
            .emitter_mut()
            .take_pending_events()
            .iter()
            .map(|e| (e.keycode, e.is_press()))
            .collect()
    }

    fn assert_mask_is_union(status: &Status<VirtualKeyboard, TraceView>) {
        let expected = status
            .modifiers()
            .active()
            .filter_map(|id| status.key(id))
            .fold(0, |acc, key| acc | key.modifier);
        assert_eq!(status.globalmod(), expected);
    }

    fn assert_single_pressed(status: &Status<VirtualKeyboard, TraceView>) {
        let pressed = status
            .keyboard()
            .iter()
            .filter(|(_, key)| key.state() == KeyState::Pressed)
            .count();
        assert!(pressed <= 1, "{} keys pressed at once", pressed);
    }

    /// Integration Test 1: Sticky Shift through pointer clicks
    ///
    /// Shift latches, then wraps the next keystroke and falls back.
    #[test]
    fn test_sticky_shift_scenario() {
        let mut status = session(InputMethod::Button);

        // Shift at (30, 60)
        status.pointer_down(30.0, 60.0);
        status.pointer_up(30.0, 60.0);
        assert_eq!(status.key(SHIFT).unwrap().state(), KeyState::Latched);
        assert_eq!(status.globalmod(), 1);

        status.pointer_down(20.0, 20.0);
        status.pointer_up(20.0, 20.0);
        assert_eq!(
            events(&mut status),
            vec![
                (keycodes::KEY_LEFTSHIFT, true),
                (keycodes::KEY_A, true),
                (keycodes::KEY_A, false),
                (keycodes::KEY_LEFTSHIFT, false),
            ]
        );
        assert_eq!(status.key(SHIFT).unwrap().state(), KeyState::Released);
        assert_eq!(status.globalmod(), 0);
    }

    /// Integration Test 2: Caps Lock toggles on and off
    #[test]
    fn test_caps_lock_scenario() {
        let mut status = session(InputMethod::Button);

        status.set_pressed(Some(CAPS));
        assert_eq!(status.key(CAPS).unwrap().state(), KeyState::Locked);
        assert_eq!(status.globalmod(), 2);

        status.set_pressed(Some(CAPS));
        assert_eq!(status.key(CAPS).unwrap().state(), KeyState::Released);
        assert_eq!(status.globalmod(), 0);
    }

    /// Integration Test 3: Touch tap holds, then fires on lift-off
    #[test]
    fn test_touch_tap_scenario() {
        let mut status = session(InputMethod::Touch);

        status.pointer_down(20.0, 20.0);
        assert_eq!(status.key(A).unwrap().state(), KeyState::Pressed);
        assert!(events(&mut status).is_empty());

        status.pointer_up(20.0, 20.0);
        assert_eq!(status.key(A).unwrap().state(), KeyState::Released);
        assert_eq!(
            events(&mut status),
            vec![(keycodes::KEY_A, true), (keycodes::KEY_A, false)]
        );
    }

    /// Integration Test 4: Ramble detects a right-angle turn
    #[test]
    fn test_ramble_turn_scenario() {
        let mut ramble = Ramble::new(Config::default().ramble);
        ramble.start(0.0, 0.0, None);
        assert!(!ramble.add_point(10.0, 0.0, None));
        assert!(ramble.add_point(10.0, 10.0, None));
    }

    /// Integration Test 5: Illegal transition leaves the key untouched
    #[test]
    fn test_illegal_transition_scenario() {
        // A latched locker cannot be reached through the tables.
        let mut keys: Vec<Key> = Keyboard::from_json_str(LAYOUT)
            .unwrap()
            .iter()
            .map(|(_, key)| key.clone())
            .collect();
        keys[CAPS.0].set_state(KeyState::Latched);
        let keyboard = Keyboard::new(keys).unwrap();
        let mut status = Status::new(keyboard, VirtualKeyboard::new(), TraceView, &Config::default());

        status.set_pressed(Some(CAPS));
        assert_eq!(status.key(CAPS).unwrap().state(), KeyState::Latched);
        assert_eq!(status.fsm_error_count(), 1);
        assert_eq!(status.globalmod(), 0);
        assert!(events(&mut status).is_empty());

        status.reset();
        assert_eq!(status.key(CAPS).unwrap().state(), KeyState::Released);
    }

    /// Integration Test 6: Global mask and pressed-key invariants hold across
    /// a mixed session
    #[test]
    fn test_invariants_across_session() {
        let mut status = session(InputMethod::Touch);
        let (tx, rx) = sync_channel();
        status.attach_sync(rx);

        let taps = [(30.0, 60.0), (90.0, 60.0), (20.0, 20.0), (30.0, 60.0), (30.0, 60.0)];
        for (x, y) in taps {
            status.pointer_down(x, y);
            assert_single_pressed(&status);
            assert_mask_is_union(&status);

            status.pointer_motion(x + 25.0, y);
            assert_single_pressed(&status);

            status.pointer_up(x + 25.0, y);
            assert_single_pressed(&status);
            assert_mask_is_union(&status);
        }

        tx.send(keycodes::KEY_CAPSLOCK, true);
        tx.send(keycodes::KEY_CAPSLOCK, false);
        status.poll_external_events();
        assert_mask_is_union(&status);

        status.set_input_method(InputMethod::Button);
        for (x, y) in taps {
            status.pointer_down(x, y);
            status.pointer_up(x, y);
            assert_single_pressed(&status);
            assert_mask_is_union(&status);
        }
        assert_eq!(status.fsm_error_count(), 0);
    }

    /// Integration Test 7: Pointer round trip over every key
    ///
    /// Every normal key clicked through the pointer entry points sends exactly
    /// one down/up pair and ends released.
    #[test]
    fn test_pointer_round_trip() {
        let mut status = session(InputMethod::Button);
        let normals: Vec<(KeyId, u32, (f64, f64))> = status
            .keyboard()
            .iter()
            .filter(|(_, key)| !key.is_modifier())
            .map(|(id, key)| (id, key.code, key.center()))
            .collect();

        for (id, code, (x, y)) in normals {
            status.pointer_motion(x, y);
            assert_eq!(status.focus(), Some(id));
            status.pointer_down(x, y);
            status.pointer_up(x, y);
            assert_eq!(events(&mut status), vec![(code, true), (code, false)]);
            assert_eq!(status.key(id).unwrap().state(), KeyState::Released);
        }
    }
}
