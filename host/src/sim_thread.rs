//! # Simulation Thread
//!
//! Owns the engine for the lifetime of a session and runs it frame by
//! frame. The control thread talks to it only through [`Shared`].
//!
//! ```text
//! ┌──────────────────────────┐              ┌───────────────────────────┐
//! │    Simulation Thread     │              │      Control Thread       │
//! │                          │   Commands   │                           │
//! │  loop {                  │ ◄─────────── │  Session                  │
//! │    drain command queue   │   (mutex)    │   - enqueue commands      │
//! │    if running:           │              │   - move the pointer      │
//! │      engine.run_frame()  │   Status     │   - poll status           │
//! │      write status        │ ───────────► │                           │
//! │  }                       │  (atomics)   │                           │
//! └──────────────────────────┘              └───────────────────────────┘
//! ```

use std::{
    sync::{Arc, mpsc},
    thread,
    time::Duration,
};

use tracing::{debug, info};

use machine::{
    command::Command,
    engine::{Engine, EngineError, FrameContext, FrameReport, Launch},
    media::{FIRST_DRIVE_UNIT, MediaRef},
};

use crate::{
    pointer::PointerState,
    queue::{CommandQueue, Disposition, Drain},
    status_buffer::StatusRecorder,
};

/// How long a paused thread sleeps between drains.
const PAUSED_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// State both threads touch.
#[derive(Debug, Default)]
pub struct Shared {
    pub queue: CommandQueue,
    pub status: StatusRecorder,
    pub pointer: PointerState,
}

/// What to poke once autostart has injected a program taken from a disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub pokes: Vec<(u16, u8)>,
    pub disk_id: Option<[u8; 2]>,
}

pub struct SimThread<E> {
    engine: E,
    shared: Arc<Shared>,
    injection: Option<Injection>,
    running: bool,
}

impl<E: Engine> SimThread<E> {
    pub const fn new(engine: E, shared: Arc<Shared>, injection: Option<Injection>) -> Self {
        Self {
            engine,
            shared,
            injection,
            running: true,
        }
    }

    /// Boots the engine, reports the outcome on `ready` and, if it booted,
    /// runs until a [`Command::Quit`] is drained.
    pub fn run(mut self, launch: &Launch, ready: &mpsc::Sender<Result<(), EngineError>>) {
        if let Err(err) = self.engine.boot(launch) {
            let _ = ready.send(Err(err));
            return;
        }
        if ready.send(Ok(())).is_err() {
            // nobody is waiting for this session anymore
            self.engine.shutdown();
            return;
        }

        let shared = Arc::clone(&self.shared);
        loop {
            if shared.queue.drain_and_apply(|command| self.apply(command)) == Drain::Stop {
                break;
            }

            if self.running {
                self.run_frame();
            } else {
                thread::sleep(PAUSED_POLL_INTERVAL);
            }
        }

        self.engine.shutdown();
        info!("simulation thread stopped");
    }

    fn run_frame(&mut self) {
        let frame = FrameContext {
            status: &self.shared.status,
            pointer: self.shared.pointer.snapshot(),
        };
        if self.engine.run_frame(&frame) == FrameReport::AutostartInjected {
            self.inject_device_info();
        }
    }

    fn inject_device_info(&mut self) {
        let Some(injection) = &self.injection else {
            return;
        };
        debug!("injecting device info for autostarted program");
        for &(address, value) in &injection.pokes {
            self.engine.inject_memory(address, value);
        }
        if let Some(id) = injection.disk_id {
            self.engine.set_drive_id(FIRST_DRIVE_UNIT, id);
        }
    }

    fn apply(&mut self, command: Command) -> Disposition {
        // Delays count frames, and a paused machine runs none.
        if !self.running && command.delay() > 0 {
            return Disposition::Defer(command);
        }
        if let Some(later) = command.deferred() {
            debug!("deferring {later:?}");
            return Disposition::Defer(later);
        }
        debug!("applying {command:?}");

        match command {
            Command::Attach { unit, media } => {
                self.engine
                    .attach_disk(unit, media.as_ref().map(MediaRef::path));
            }
            Command::Freeze => self.engine.trigger_freeze(),
            Command::Reset => self.engine.trigger_reset(),
            Command::Quit => return Disposition::Stop,
            Command::Key { key, pressed, .. } => {
                if let Some((row, column)) = key.matrix() {
                    self.engine.set_key(row, column, pressed);
                }
            }
            Command::Joystick { port, buttons } => {
                self.engine.set_joystick(port, buttons.value());
            }
            Command::MouseButton { button, pressed } => {
                self.engine.mouse_button(button, pressed);
            }
            Command::Restore { pressed } => self.engine.set_restore(pressed),
            Command::SetResource { name, value } => self.engine.set_resource(&name, &value),
            Command::PlayPause { running } => self.running = running,
        }
        Disposition::Applied
    }
}
