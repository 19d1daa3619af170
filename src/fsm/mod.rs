// SPDX-License-Identifier: GPL-3.0-only

//! Key finite state machine.
//!
//! Every key reacts to four events. `Press` and `Release` are requests coming
//! from the user through the on-screen keyboard; `Pressed` and `Released` are
//! echoes of something that already happened, such as a physical keyboard
//! changing the Caps Lock state.
//!
//! The reaction depends on the key class and current state, and on the
//! [`Profile`] selected by the input method. Transitions are plain data (see
//! [`table`]); each one names the next state and an ordered list of
//! [`Action`]s that the [`FsmContext`] performs after the state switch.
//!
//! # Sticky keys
//!
//! With the pointer profile, clicking Shift latches it. Clicking a normal key
//! then sends Shift down, key down, key up, Shift up and releases Shift again.
//! Clicking a latched modifier locks it; clicking a locked one releases it.

pub mod table;

use crate::config::InputMethod;
use crate::keyboard::{Key, KeyClass, KeyId, KeyState};

/// Event fed to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsmEvent {
    /// Activation requested by the user.
    Press = 0,
    /// Deactivation requested by the user.
    Release = 1,
    /// An activation already took effect elsewhere and must be reflected.
    Pressed = 2,
    /// A deactivation already took effect elsewhere and must be reflected.
    Released = 3,
}

impl FsmEvent {
    /// Number of events.
    pub const COUNT: usize = 4;
}

/// Primitive performed against the session coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Send key-down and mark the key pressed.
    Press,
    /// Send key-up.
    Release,
    /// Send key-down, track the key as pressed and redraw it.
    PressUpdate,
    /// Send key-up, stop tracking the key as pressed and redraw it.
    ReleaseUpdate,
    /// Add the key to the latched set.
    Latch,
    /// Remove the key from the latched set.
    Unlatch,
    /// Add the key to the locked set.
    Lock,
    /// Remove the key from the locked set.
    Unlock,
    /// Send key-down for every latched and locked modifier.
    PressLatched,
    /// Send key-up for every latched and locked modifier, in reverse order.
    ReleaseLatched,
    /// Release every latched modifier.
    UnlatchAll,
    /// Redraw the whole keyboard.
    UpdateView,
    /// Redraw the key.
    UpdateKey,
    /// Log an illegal transition.
    Error,
}

/// Transition table selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Discrete pointer input: a press is a whole keystroke.
    Pointer,
    /// Touch input: keys are held on press and fire on release.
    Touch,
}

impl Profile {
    /// Profile used by an input method.
    pub fn for_method(method: InputMethod) -> Self {
        match method {
            InputMethod::Touch => Profile::Touch,
            InputMethod::Button | InputMethod::Timer | InputMethod::Ramble => Profile::Pointer,
        }
    }
}

/// A table cell: the next state and the actions to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after the transition.
    pub next: KeyState,
    /// Actions in execution order.
    pub actions: &'static [Action],
}

impl Transition {
    /// Returns `true` for the fallback of an undefined cell.
    pub fn is_illegal(&self) -> bool {
        matches!(self.actions, [Action::Error])
    }
}

/// What the state machine needs from its owner.
pub trait FsmContext {
    /// Profile of the active input method.
    fn profile(&self) -> Profile;

    /// Mutable access to a key.
    fn key_mut(&mut self, id: KeyId) -> Option<&mut Key>;

    /// Performs one action for `key`.
    fn perform(&mut self, action: Action, key: KeyId);
}

/// Feeds `event` to `key`: switches its state, then runs the actions in order.
///
/// Returns the applied transition, or `None` if the key does not exist.
pub fn process<C: FsmContext + ?Sized>(
    ctx: &mut C,
    id: KeyId,
    event: FsmEvent,
) -> Option<Transition> {
    let profile = ctx.profile();
    let Some(key) = ctx.key_mut(id) else {
        tracing::warn!("FSM event {:?} for unknown key {}", event, id);
        return None;
    };

    let state = key.state();
    let class: KeyClass = key.class();
    let transition = table::lookup(profile, event, class, state);
    key.set_state(transition.next);

    tracing::debug!(
        "Key {} (code {}, {:?}): {:?} received, switching from {:?} to {:?}",
        id,
        key.code,
        class,
        event,
        state,
        transition.next
    );

    for &action in transition.actions {
        ctx.perform(action, id);
    }
    Some(transition)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal context recording every action.
    struct Recorder {
        profile: Profile,
        keys: Vec<Key>,
        performed: Vec<(Action, KeyId)>,
    }

    impl Recorder {
        fn new(profile: Profile, keys: Vec<Key>) -> Self {
            Self {
                profile,
                keys,
                performed: Vec::new(),
            }
        }

        fn actions(&self) -> Vec<Action> {
            self.performed.iter().map(|(a, _)| *a).collect()
        }
    }

    impl FsmContext for Recorder {
        fn profile(&self) -> Profile {
            self.profile
        }

        fn key_mut(&mut self, id: KeyId) -> Option<&mut Key> {
            self.keys.get_mut(id.0)
        }

        fn perform(&mut self, action: Action, key: KeyId) {
            self.performed.push((action, key));
        }
    }

    #[test]
    fn test_profile_for_method() {
        assert_eq!(Profile::for_method(InputMethod::Touch), Profile::Touch);
        assert_eq!(Profile::for_method(InputMethod::Button), Profile::Pointer);
        assert_eq!(Profile::for_method(InputMethod::Timer), Profile::Pointer);
        assert_eq!(Profile::for_method(InputMethod::Ramble), Profile::Pointer);
    }

    /// The state switches before actions run, and actions run in table order.
    #[test]
    fn test_process_switches_state_and_runs_actions() {
        let mut ctx = Recorder::new(
            Profile::Pointer,
            vec![Key::new(50, 0.0, 0.0, 1.0, 1.0).with_modifier(1)],
        );

        let tr = process(&mut ctx, KeyId(0), FsmEvent::Press).unwrap();
        assert_eq!(tr.next, KeyState::Latched);
        assert_eq!(ctx.keys[0].state(), KeyState::Latched);
        assert_eq!(ctx.actions(), vec![Action::Latch, Action::UpdateView]);

        process(&mut ctx, KeyId(0), FsmEvent::Press);
        assert_eq!(ctx.keys[0].state(), KeyState::Locked);
        assert_eq!(
            ctx.actions()[2..],
            [Action::Unlatch, Action::Lock, Action::UpdateView]
        );
    }

    /// An impossible state yields a single error action and no state change.
    #[test]
    fn test_process_illegal_transition() {
        let mut caps = Key::new(66, 0.0, 0.0, 1.0, 1.0).with_locker(2);
        caps.set_state(KeyState::Latched);
        let mut ctx = Recorder::new(Profile::Pointer, vec![caps]);

        let tr = process(&mut ctx, KeyId(0), FsmEvent::Press).unwrap();
        assert!(tr.is_illegal());
        assert_eq!(ctx.keys[0].state(), KeyState::Latched);
        assert_eq!(ctx.performed, vec![(Action::Error, KeyId(0))]);
    }

    #[test]
    fn test_process_unknown_key() {
        let mut ctx = Recorder::new(Profile::Touch, Vec::new());
        assert!(process(&mut ctx, KeyId(3), FsmEvent::Press).is_none());
        assert!(ctx.performed.is_empty());
    }

    /// Touch press holds a normal key; release fires the keystroke.
    #[test]
    fn test_touch_hold_then_fire() {
        let mut ctx = Recorder::new(Profile::Touch, vec![Key::new(38, 0.0, 0.0, 1.0, 1.0)]);

        process(&mut ctx, KeyId(0), FsmEvent::Press);
        assert_eq!(ctx.keys[0].state(), KeyState::Pressed);
        assert_eq!(ctx.actions(), vec![Action::UpdateKey]);

        process(&mut ctx, KeyId(0), FsmEvent::Release);
        assert_eq!(ctx.keys[0].state(), KeyState::Released);
        assert_eq!(
            ctx.actions()[1..],
            [
                Action::PressLatched,
                Action::PressUpdate,
                Action::ReleaseUpdate,
                Action::ReleaseLatched,
                Action::UnlatchAll,
                Action::UpdateView,
            ]
        );
    }
}
