// SPDX-License-Identifier: GPL-3.0-only

//! Static transition tables.
//!
//! Each profile is a `[event][class][state]` array. A `None` cell is an
//! illegal transition: the key keeps its state and the `Error` action runs.

use super::{Action, FsmEvent, Profile, Transition};
use crate::keyboard::{KeyClass, KeyState};

use Action::*;
use KeyState::{Latched as LA, Locked as LO, Pressed as P, Released as R};

type Row = [Option<Transition>; KeyState::COUNT];
type Table = [[Row; KeyClass::COUNT]; FsmEvent::COUNT];

const fn t(next: KeyState, actions: &'static [Action]) -> Option<Transition> {
    Some(Transition { next, actions })
}

const X: Option<Transition> = None;

const NONE: &[Action] = &[];
const UV: &[Action] = &[UpdateView];
const UK: &[Action] = &[UpdateKey];

/// Full keystroke: modifiers down, key down, key up, modifiers up, then the
/// latched modifiers fall back to released.
const CLICK: &[Action] = &[
    PressLatched,
    Press,
    Release,
    ReleaseLatched,
    UnlatchAll,
    UpdateView,
];

/// Touch keystroke, which also tracks the pressed key while it runs.
const TAP: &[Action] = &[
    PressLatched,
    PressUpdate,
    ReleaseUpdate,
    ReleaseLatched,
    UnlatchAll,
    UpdateView,
];

/// End of a keystroke whose key-down was already sent.
const RELEASE_CYCLE: &[Action] = &[Release, ReleaseLatched, UnlatchAll, UpdateView];

const LATCH: &[Action] = &[Latch, UpdateView];
const UNLATCH_LOCK: &[Action] = &[Unlatch, Lock, UpdateView];
const LOCK: &[Action] = &[Lock, UpdateView];
const UNLOCK: &[Action] = &[Unlock, UpdateView];
const TOGGLE_LOCK: &[Action] = &[Press, Release, Lock, UpdateView];
const TOGGLE_UNLOCK: &[Action] = &[Press, Release, Unlock, UpdateView];

//                                    Released          Pressed         Latched          Locked
const MODIFIER_TOGGLE: Row = [t(LA, LATCH), X, t(LO, UNLATCH_LOCK), t(R, UNLOCK)];
const LOCKER_TOGGLE: Row = [t(LO, TOGGLE_LOCK), X, X, t(R, TOGGLE_UNLOCK)];
const MODIFIER_IDLE: Row = [t(R, NONE), X, t(LA, NONE), t(LO, NONE)];
const LOCKER_IDLE: Row = [t(R, NONE), X, X, t(LO, NONE)];
const MODIFIER_REDRAW: Row = [t(R, UK), X, t(LA, UK), t(LO, UK)];
const LOCKER_REDRAW: Row = [t(R, UK), X, X, t(LO, UK)];
const LOCKER_ECHO: Row = [t(LO, LOCK), X, X, t(R, UNLOCK)];

/// Pointer profile: discrete clicks, sticky modifiers.
static POINTER: Table = [
    // PRESS
    [
        [t(R, CLICK), t(P, NONE), X, X],
        MODIFIER_TOGGLE,
        LOCKER_TOGGLE,
    ],
    // RELEASE
    [
        [t(R, NONE), t(R, RELEASE_CYCLE), X, X],
        MODIFIER_REDRAW,
        LOCKER_REDRAW,
    ],
    // PRESSED
    [
        [t(P, UV), t(P, NONE), X, X],
        MODIFIER_IDLE,
        LOCKER_ECHO,
    ],
    // RELEASED
    [
        [t(R, NONE), t(R, UV), X, X],
        MODIFIER_IDLE,
        LOCKER_IDLE,
    ],
];

/// Touch profile: keys fire on lift-off.
static TOUCH: Table = [
    // PRESS
    [
        [t(P, UK), t(P, NONE), X, X],
        MODIFIER_IDLE,
        LOCKER_IDLE,
    ],
    // RELEASE
    [
        [t(R, TAP), t(R, TAP), X, X],
        MODIFIER_TOGGLE,
        LOCKER_TOGGLE,
    ],
    // PRESSED
    [
        [t(P, UV), t(P, NONE), X, X],
        MODIFIER_IDLE,
        LOCKER_ECHO,
    ],
    // RELEASED
    [
        [X, t(R, UV), X, X],
        MODIFIER_IDLE,
        LOCKER_IDLE,
    ],
];

const ILLEGAL: &[Action] = &[Error];

/// Looks up the transition for a key in `state` of `class` receiving `event`.
///
/// Illegal cells resolve to a transition that keeps `state` and runs `Error`.
pub fn lookup(profile: Profile, event: FsmEvent, class: KeyClass, state: KeyState) -> Transition {
    let table = match profile {
        Profile::Pointer => &POINTER,
        Profile::Touch => &TOUCH,
    };
    table[event as usize][class as usize][state as usize].unwrap_or(Transition {
        next: state,
        actions: ILLEGAL,
    })
}

/// Returns `true` if the cell is defined.
pub fn is_legal(profile: Profile, event: FsmEvent, class: KeyClass, state: KeyState) -> bool {
    !lookup(profile, event, class, state).is_illegal()
}
