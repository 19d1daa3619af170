// SPDX-License-Identifier: GPL-3.0-only

//! Latchboard session replay
//!
//! Loads a key set, replays a recorded list of pointer, timer and hardware
//! keyboard steps through a session, and prints every synthetic key event the
//! session sends plus the final modifier mask.
//!
//! Script format:
//!
//! ```json
//! [
//!     { "step": "down", "x": 10, "y": 50 },
//!     { "step": "up", "x": 10, "y": 50 },
//!     { "step": "tick", "ms": 1000 },
//!     { "step": "external", "code": 58, "pressed": true },
//!     { "step": "method", "method": "touch" }
//! ]
//! ```

use clap::{Arg, Command};
use latchboard::app_settings::DWELL_TICK_INTERVAL_MS;
use latchboard::input::{KeyDirection, TraceView, VirtualKeyboard};
use latchboard::status::{run_sync_replay, sync_channel};
use latchboard::{Config, InputMethod, Keyboard, Status};
use serde::Deserialize;
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// One recorded input step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
enum ScriptStep {
    Motion { x: f64, y: f64 },
    Down { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Leave,
    /// Advance the dwell clock, ticking the timer along the way.
    Tick { ms: u64 },
    /// A physical key change reported by the hardware keyboard.
    External { code: u32, pressed: bool },
    Method { method: InputMethod },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("latchboard=info".parse()?),
        )
        .init();

    let matches = Command::new("latchboard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Replays input sessions through the on-screen keyboard core")
        .arg(
            Arg::new("keys")
                .long("keys")
                .help("JSON key set")
                .required(true),
        )
        .arg(
            Arg::new("script")
                .long("script")
                .help("JSON list of input steps")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON session configuration"),
        )
        .get_matches();

    let (Some(keys_path), Some(script_path)) = (
        matches.get_one::<String>("keys"),
        matches.get_one::<String>("script"),
    ) else {
        return Err("--keys and --script are required".into());
    };

    let keyboard = Keyboard::from_file(keys_path)?;
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let script: Vec<ScriptStep> = serde_json::from_str(&std::fs::read_to_string(script_path)?)?;
    tracing::info!("Replaying {} steps from {}", script.len(), script_path);

    let status = Rc::new(RefCell::new(Status::new(
        keyboard,
        VirtualKeyboard::new(),
        TraceView,
        &config,
    )));
    let (recorder, receiver) = sync_channel();
    status.borrow_mut().attach_sync(receiver);

    let mut clock = Instant::now();
    for (index, step) in script.into_iter().enumerate() {
        let mut status = status.borrow_mut();
        match step {
            ScriptStep::Motion { x, y } => status.pointer_motion(x, y),
            ScriptStep::Down { x, y } => status.pointer_down(x, y),
            ScriptStep::Up { x, y } => status.pointer_up(x, y),
            ScriptStep::Leave => status.pointer_leave(),
            ScriptStep::Tick { ms } => {
                let end = clock + Duration::from_millis(ms);
                let interval = Duration::from_millis(DWELL_TICK_INTERVAL_MS);
                while clock < end {
                    clock = (clock + interval).min(end);
                    status.dwell_tick(clock);
                }
            }
            ScriptStep::External { code, pressed } => {
                recorder.send(code, pressed);
                status.poll_external_events();
            }
            ScriptStep::Method { method } => status.set_input_method(method),
        }
        print_events(index, &mut status);
    }

    drop(recorder);
    run_sync_replay(Rc::clone(&status), config.sync_poll_interval()).await;

    let status = status.borrow();
    println!("mask: {:#x}", status.globalmod());
    if status.fsm_error_count() > 0 {
        println!("illegal transitions: {}", status.fsm_error_count());
    }
    Ok(())
}

fn print_events(index: usize, status: &mut Status<VirtualKeyboard, TraceView>) {
    for event in status.emitter_mut().take_pending_events() {
        let direction = match event.direction {
            KeyDirection::Pressed => "down",
            KeyDirection::Released => "up",
        };
        println!("{:>4}  {:>5} {}", index, event.keycode, direction);
    }
}
