// SPDX-License-Identifier: GPL-3.0-only

//! Session coordinator.
//!
//! [`Status`] is the single owner of everything a running keyboard session
//! knows: the keys, the focused and pressed key, the latched and locked
//! modifiers, the active input method, the dwell timer and the ramble
//! gesture. The windowing layer feeds it pointer events; it decides which
//! key receives which [`FsmEvent`] and performs the resulting actions.
//!
//! Everything runs on the UI thread. The only cross-thread input is the
//! hardware keyboard queue (see [`sync`]), which is drained on the same loop.

pub mod sync;
pub mod timer;

pub use sync::{run_sync_replay, sync_channel, ExternalKeyEvent, SyncReceiver, SyncSender};
pub use timer::DwellTimer;

use crate::config::{Config, InputMethod};
use crate::fsm::{self, Action, FsmContext, FsmEvent, Profile};
use crate::input::{KeyEmitter, ModifierState, ViewNotifier};
use crate::keyboard::{Key, KeyClass, KeyId, KeyState, Keyboard};
use crate::ramble::{Ramble, RambleKey};
use std::time::Instant;

/// A keyboard session.
pub struct Status<E: KeyEmitter, V: ViewNotifier> {
    keyboard: Keyboard,
    emitter: E,
    view: V,
    modifiers: ModifierState,

    /// Key under the pointer.
    focus: Option<KeyId>,
    /// Key considered down.
    pressed: Option<KeyId>,
    /// Key put into the pressed state by the last touch press.
    touch_hold: Option<KeyId>,

    input_method: InputMethod,
    timer: DwellTimer,
    ramble: Ramble,
    sync: Option<SyncReceiver>,

    /// Illegal transitions seen since creation.
    fsm_errors: usize,
}

impl<E: KeyEmitter, V: ViewNotifier> Status<E, V> {
    /// Creates a session for `keyboard`.
    pub fn new(keyboard: Keyboard, emitter: E, view: V, config: &Config) -> Self {
        tracing::info!(
            "Starting session with {} keys, input method {}",
            keyboard.len(),
            config.input_method
        );
        Self {
            keyboard,
            emitter,
            view,
            modifiers: ModifierState::new(),
            focus: None,
            pressed: None,
            touch_hold: None,
            input_method: config.input_method,
            timer: DwellTimer::new(config.dwell_duration()),
            ramble: Ramble::new(config.ramble.clone()),
            sync: None,
            fsm_errors: 0,
        }
    }

    /// Clears every piece of derived state.
    ///
    /// Keys go back to released, modifiers are dropped and anything still
    /// down on the emitter is released.
    pub fn reset(&mut self) {
        self.focus = None;
        self.pressed = None;
        self.touch_hold = None;
        self.modifiers.clear_all();
        self.timer.stop();
        self.ramble.reset(None);
        self.keyboard.release_all();
        self.emitter.release_stuck();
        self.view.notify_view_changed();
        tracing::debug!("Session reset");
    }

    /// Replaces the layout and resets the session.
    pub fn load_keyboard(&mut self, keyboard: Keyboard) {
        tracing::info!("Loading layout with {} keys", keyboard.len());
        self.keyboard = keyboard;
        self.reset();
    }

    /// Moves the focus and redraws the old and new focus key.
    ///
    /// Focus alone never fires a state machine event.
    pub fn set_focus(&mut self, key: Option<KeyId>) {
        let previous = std::mem::replace(&mut self.focus, key);
        if let Some(previous) = previous {
            self.view.notify_key_changed(previous);
        }
        if let Some(key) = key.filter(|&key| Some(key) != previous) {
            self.view.notify_key_changed(key);
        }
    }

    /// Presses `key`, or releases the pressed key when `None`.
    ///
    /// Under the touch method the release goes to the focused key, since
    /// lifting the finger releases whatever it rests on. A touch press held on
    /// one key and lifted off another first cancels the abandoned hold with a
    /// `Released` echo.
    pub fn set_pressed(&mut self, key: Option<KeyId>) {
        let touch = self.profile() == Profile::Touch;
        match key {
            Some(key) => {
                if self.keyboard.get(key).is_none() {
                    tracing::warn!("Press requested for unknown key {}", key);
                    return;
                }
                if touch {
                    self.touch_hold = Some(key);
                }
                self.pressed = Some(key);
                fsm::process(self, key, FsmEvent::Press);
                if touch && !self.moves_window(key) {
                    self.pressed = self.focus;
                }
            }
            None => {
                if touch {
                    self.cancel_abandoned_hold();
                }
                let target = if touch { self.focus } else { self.pressed };
                let Some(target) = target else {
                    return;
                };
                fsm::process(self, target, FsmEvent::Release);
                let is_modifier = self.keyboard.get(target).is_some_and(Key::is_modifier);
                self.pressed = if touch && is_modifier {
                    None
                } else {
                    Some(target)
                };
            }
        }
    }

    fn cancel_abandoned_hold(&mut self) {
        let Some(held) = self.touch_hold.take() else {
            return;
        };
        let still_down = self
            .keyboard
            .get(held)
            .is_some_and(|key| key.state() == KeyState::Pressed);
        if Some(held) != self.focus && still_down {
            tracing::debug!("Touch hold on {} abandoned", held);
            fsm::process(self, held, FsmEvent::Released);
        }
    }

    fn moves_window(&self, key: KeyId) -> bool {
        self.keyboard.get(key).is_some_and(|key| key.moves_window)
    }

    /// Presses and releases `key` as one click.
    fn click(&mut self, key: KeyId) {
        self.set_pressed(Some(key));
        self.set_pressed(None);
    }

    fn ramble_key(&self, key: Option<KeyId>) -> Option<RambleKey> {
        let id = key?;
        self.keyboard.get(id).map(|k| RambleKey::from((id, k)))
    }

    /// Key under the point, or `None`.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<KeyId> {
        self.keyboard.hit_test(x, y)
    }

    // ------------------------------------------------------------------------
    // Pointer entry points
    // ------------------------------------------------------------------------

    /// Pointer moved to `(x, y)`.
    pub fn pointer_motion(&mut self, x: f64, y: f64) {
        let key = self.hit_test(x, y);
        if key != self.focus {
            self.set_focus(key);
            if self.input_method == InputMethod::Timer {
                match key {
                    Some(_) => self.timer_start(),
                    None => self.timer_stop(),
                }
            }
        }

        if self.input_method == InputMethod::Ramble
            && self.ramble.is_active()
            && self.ramble.add_point(x, y, self.ramble_key(key))
        {
            if let Some(key) = key {
                self.click(key);
            }
        }
    }

    /// Button pressed or finger down at `(x, y)`.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        let key = self.hit_test(x, y);
        if key != self.focus {
            self.set_focus(key);
        }

        match self.input_method {
            InputMethod::Button | InputMethod::Timer | InputMethod::Touch => {
                if let Some(key) = key {
                    self.set_pressed(Some(key));
                }
            }
            InputMethod::Ramble => {
                if self.ramble.start(x, y, self.ramble_key(key)) {
                    if let Some(key) = key {
                        self.click(key);
                    }
                }
            }
        }
    }

    /// Button released or finger lifted at `(x, y)`.
    pub fn pointer_up(&mut self, x: f64, y: f64) {
        let key = self.hit_test(x, y);
        if key != self.focus {
            self.set_focus(key);
        }

        match self.input_method {
            InputMethod::Button | InputMethod::Timer | InputMethod::Touch => {
                self.set_pressed(None);
            }
            InputMethod::Ramble => {
                if self.ramble.started() && self.ramble.reset(key) {
                    if let Some(key) = key {
                        self.click(key);
                    }
                }
            }
        }
    }

    /// Pointer left the keyboard.
    pub fn pointer_leave(&mut self) {
        self.set_focus(None);
        self.timer_stop();
        if self.input_method == InputMethod::Ramble {
            self.ramble.reset(None);
        }
    }

    // ------------------------------------------------------------------------
    // Dwell timer
    // ------------------------------------------------------------------------

    /// Starts the dwell timer, restarting it if it already runs.
    pub fn timer_start(&mut self) {
        self.timer.start_at(Instant::now());
    }

    /// Stops the dwell timer.
    pub fn timer_stop(&mut self) {
        self.timer.stop();
    }

    /// Dwell completion in `[0.0, 1.0]`, or `None` when the timer is stopped.
    pub fn timer_progress(&self) -> Option<f64> {
        self.timer.progress_at(Instant::now())
    }

    /// Timer loop callback.
    ///
    /// Redraws the focused key to show the progress and clicks it once the
    /// dwell duration has elapsed. Returns `true` if a click happened.
    pub fn dwell_tick(&mut self, now: Instant) -> bool {
        if self.input_method != InputMethod::Timer {
            return false;
        }
        let Some(focus) = self.focus else {
            return false;
        };
        let Some(progress) = self.timer.progress_at(now) else {
            return false;
        };

        self.view.notify_key_changed(focus);
        if progress < 1.0 {
            return false;
        }
        tracing::debug!("Dwell completed on {}", focus);
        self.click(focus);
        self.timer.start_at(now);
        true
    }

    // ------------------------------------------------------------------------
    // Hardware keyboard sync
    // ------------------------------------------------------------------------

    /// Connects the receiving end of a hardware keyboard queue.
    pub fn attach_sync(&mut self, receiver: SyncReceiver) {
        self.sync = Some(receiver);
    }

    /// Returns `true` while a hardware keyboard queue is attached.
    pub fn has_sync(&self) -> bool {
        self.sync.is_some()
    }

    /// Reflects a physical key change on the key with that code.
    ///
    /// Codes without a key are ignored.
    pub fn inject_external_event(&mut self, code: u32, pressed: bool) {
        let Some(key) = self.keyboard.find_code(code) else {
            tracing::debug!("Ignoring hardware event for unmapped code {}", code);
            return;
        };
        let event = if pressed {
            FsmEvent::Pressed
        } else {
            FsmEvent::Released
        };
        fsm::process(self, key, event);
    }

    /// Replays every queued hardware event. Returns how many were replayed.
    ///
    /// This is the callback of the sync poll loop: the UI loop calls it every
    /// `sync_poll_ms`, between pointer and timer events (see
    /// [`run_sync_replay`]). Detaches the queue once the recorder has
    /// disconnected.
    pub fn poll_external_events(&mut self) -> usize {
        let Some(receiver) = self.sync.as_mut() else {
            return 0;
        };
        let events = receiver.drain();
        if receiver.is_closed() {
            self.sync = None;
        }
        for event in &events {
            self.inject_external_event(event.code, event.pressed);
        }
        events.len()
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Global modifier mask: the OR of every latched and locked modifier.
    pub fn globalmod(&self) -> u32 {
        self.modifiers.mask()
    }

    /// Latched and locked modifiers.
    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    pub fn focus(&self) -> Option<KeyId> {
        self.focus
    }

    pub fn pressed(&self) -> Option<KeyId> {
        self.pressed
    }

    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keyboard.get(id)
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut E {
        &mut self.emitter
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn ramble(&self) -> &Ramble {
        &self.ramble
    }

    pub fn input_method(&self) -> InputMethod {
        self.input_method
    }

    /// Switches the input method.
    ///
    /// Stops the dwell timer and drops any gesture in progress. A key held
    /// by a touch press is let go without typing it, since its key-down was
    /// never sent. Other key states are left alone. Switching to the timer
    /// method while a key is focused starts the dwell right away.
    pub fn set_input_method(&mut self, method: InputMethod) {
        if method == self.input_method {
            return;
        }
        tracing::info!("Input method {} -> {}", self.input_method, method);
        self.cancel_touch_hold();
        self.input_method = method;
        self.timer.stop();
        self.ramble.reset(None);
        if method == InputMethod::Timer && self.focus.is_some() {
            self.timer_start();
        }
    }

    fn cancel_touch_hold(&mut self) {
        let Some(held) = self.touch_hold.take() else {
            return;
        };
        if self.key(held).is_some_and(|key| key.state() == KeyState::Pressed) {
            tracing::debug!("Touch hold on {} cancelled", held);
            fsm::process(self, held, FsmEvent::Released);
        }
        self.pressed = None;
    }

    /// Number of illegal transitions seen since the session started.
    pub fn fsm_error_count(&self) -> usize {
        self.fsm_errors
    }

    /// Codes of the latched and locked modifiers to replay around a keystroke.
    ///
    /// Lockers toggle on every key-down, so they are never replayed.
    fn replay_codes(&self) -> Vec<u32> {
        self.modifiers
            .active()
            .filter_map(|id| self.keyboard.get(id))
            .filter(|key| key.class() == KeyClass::Modifier)
            .map(|key| key.code)
            .collect()
    }
}

impl<E: KeyEmitter, V: ViewNotifier> FsmContext for Status<E, V> {
    fn profile(&self) -> Profile {
        Profile::for_method(self.input_method)
    }

    fn key_mut(&mut self, id: KeyId) -> Option<&mut Key> {
        self.keyboard.get_mut(id)
    }

    fn perform(&mut self, action: Action, id: KeyId) {
        let Some(key) = self.keyboard.get(id) else {
            return;
        };
        let (code, mask) = (key.code, key.modifier);
        // The window-drag key is handled by the shell: it sends nothing and
        // leaves latched modifiers for the next real keystroke.
        let drag = key.moves_window;

        match action {
            Action::Press | Action::Release | Action::PressUpdate | Action::ReleaseUpdate
                if drag =>
            {
                match action {
                    Action::Press | Action::PressUpdate => self.pressed = Some(id),
                    Action::ReleaseUpdate if self.pressed == Some(id) => self.pressed = None,
                    _ => {}
                }
                if matches!(action, Action::PressUpdate | Action::ReleaseUpdate) {
                    self.view.notify_key_changed(id);
                }
            }
            Action::PressLatched | Action::ReleaseLatched | Action::UnlatchAll if drag => {}
            Action::Press => {
                self.emitter.emit(code, true);
                self.pressed = Some(id);
            }
            Action::Release => self.emitter.emit(code, false),
            Action::PressUpdate => {
                self.emitter.emit(code, true);
                self.pressed = Some(id);
                self.view.notify_key_changed(id);
            }
            Action::ReleaseUpdate => {
                self.emitter.emit(code, false);
                if self.pressed == Some(id) {
                    self.pressed = None;
                }
                self.view.notify_key_changed(id);
            }
            Action::Latch => self.modifiers.latch(id, mask),
            Action::Unlatch => self.modifiers.unlatch(id),
            Action::Lock => self.modifiers.lock(id, mask),
            Action::Unlock => self.modifiers.unlock(id),
            Action::PressLatched => {
                for code in self.replay_codes() {
                    self.emitter.emit(code, true);
                }
            }
            Action::ReleaseLatched => {
                for code in self.replay_codes().into_iter().rev() {
                    self.emitter.emit(code, false);
                }
            }
            Action::UnlatchAll => {
                for latched in self.modifiers.clear_latched() {
                    if let Some(key) = self.keyboard.get_mut(latched) {
                        key.set_state(KeyState::Released);
                    }
                    self.view.notify_key_changed(latched);
                }
            }
            Action::UpdateView => self.view.notify_view_changed(),
            Action::UpdateKey => self.view.notify_key_changed(id),
            Action::Error => {
                self.fsm_errors += 1;
                tracing::error!(
                    "Illegal transition on {} ({:?} key in state {:?}, {} profile)",
                    key,
                    key.class(),
                    key.state(),
                    self.input_method
                );
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
