//! The control thread's handle on one emulated machine.
//!
//! A session goes `Idle → Starting → Running → Stopping → Idle`. Every
//! input method is a thin, non-blocking call that ends in the command
//! queue; pointer movement goes to shared atomics instead. Status comes
//! back only through [`Session::poll`], on the calling thread.

use std::{
    io,
    sync::{Arc, Weak, mpsc},
    thread::{self, JoinHandle},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use machine::{
    command::{Command, MouseButton},
    engine::{Engine, EngineError, LightPen},
    joystick::{JOYSTICK_PORTS, JoystickButtons},
    key::Key,
    media::{DiskCatalog, MachineConfig, MediaKind, MediaRef, drive_index},
    resource::ResourceValue,
};

use crate::{
    keyboard::KeyMatrixState,
    launch::{LaunchPlan, TempProgram, plan_launch},
    sim_thread::{Injection, Shared, SimThread},
    staging::stage_media,
    status_buffer::{StatusBuffer, StatusObserver},
};

/// Frames an autotyped key is held down.
pub const TYPE_HOLD_FRAMES: u32 = 3;
/// Frames between releasing one autotyped key and pressing the next.
pub const TYPE_GAP_FRAMES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is already active")]
    AlreadyActive,
    #[error("could not spawn the simulation thread: {0}")]
    Spawn(#[source] io::Error),
    #[error(transparent)]
    Boot(#[from] EngineError),
    #[error("simulation thread exited before it was ready")]
    ThreadExited,
}

pub struct Session {
    config: MachineConfig,
    state: SessionState,
    shared: Arc<Shared>,
    keyboard: KeyMatrixState,
    joysticks: [JoystickButtons; JOYSTICK_PORTS],
    status: StatusBuffer,
    observer: Option<Weak<dyn StatusObserver>>,
    thread: Option<JoinHandle<()>>,
    autostart_file: Option<TempProgram>,
    /// `config` with its media swapped for the staged files, made on the
    /// first start and reused by every later one.
    staged: Option<MachineConfig>,
}

impl Session {
    #[must_use]
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            shared: Arc::new(Shared::default()),
            keyboard: KeyMatrixState::new(),
            joysticks: [JoystickButtons::default(); JOYSTICK_PORTS],
            status: StatusBuffer::new(),
            observer: None,
            thread: None,
            autostart_file: None,
            staged: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Launches the simulation thread and waits until the engine booted.
    ///
    /// On error the session is back to `Idle` and no thread is left
    /// running.
    pub fn start<E>(&mut self, engine: E, catalog: &dyn DiskCatalog) -> Result<(), SessionError>
    where
        E: Engine + 'static,
    {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyActive);
        }
        self.state = SessionState::Starting;
        info!("starting session");

        self.shared.queue.clear();
        self.shared.status.reset();
        self.status.reset();
        self.keyboard.clear();
        self.joysticks = [JoystickButtons::default(); JOYSTICK_PORTS];
        self.autostart_file = None;

        if self.staged.is_none()
            && let Some(directory) = &self.config.staging_dir
        {
            self.staged = Some(stage_media(&self.config, directory));
        }
        let LaunchPlan {
            launch,
            autostart_program,
        } = plan_launch(self.staged.as_ref().unwrap_or(&self.config), catalog);
        let injection = autostart_program.as_ref().map(|program| Injection {
            pokes: program.device_info_pokes(),
            disk_id: program.disk_id,
        });

        let (ready_tx, ready_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || SimThread::new(engine, shared, injection).run(&launch, &ready_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.state = SessionState::Idle;
                return Err(SessionError::Spawn(err));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(handle);
                self.autostart_file = autostart_program.map(|program| program.file);
                self.state = SessionState::Running;
                info!("session running");
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                self.state = SessionState::Idle;
                warn!("engine failed to boot: {err}");
                Err(err.into())
            }
            Err(_) => {
                let _ = handle.join();
                self.state = SessionState::Idle;
                warn!("simulation thread exited during start");
                Err(SessionError::ThreadExited)
            }
        }
    }

    /// Registers the status consumer. The session keeps only a weak
    /// reference; once the observer is dropped, status goes nowhere.
    pub fn set_observer(&mut self, observer: &Arc<dyn StatusObserver>) {
        self.observer = Some(Arc::downgrade(observer));
    }

    pub fn press(&mut self, key: Key, delay: u32) {
        if let Some(command) = self.keyboard.press(key, delay) {
            self.send(command);
        }
    }

    pub fn release(&mut self, key: Key, delay: u32) {
        if let Some(command) = self.keyboard.release(key, delay) {
            self.send(command);
        }
    }

    /// Types `text` one key stroke after another. Characters without a
    /// key are skipped.
    pub fn type_text(&mut self, text: &str) {
        let stroke = TYPE_HOLD_FRAMES + TYPE_GAP_FRAMES;
        let mut commands = Vec::new();
        let mut down = 0;

        for keys in text.chars().map(Key::for_char).filter(|keys| !keys.is_empty()) {
            commands.extend(keys.iter().filter_map(|&key| self.keyboard.press(key, down)));
            commands.extend(
                keys.iter()
                    .rev()
                    .filter_map(|&key| self.keyboard.release(key, down + TYPE_HOLD_FRAMES)),
            );
            down += stroke;
        }

        debug!("typing {} commands", commands.len());
        self.shared.queue.enqueue_all(commands);
    }

    /// Inserts `media` into drive `unit` (8..=11), or ejects on `None`.
    /// Images known to be something other than a disk are refused.
    pub fn attach(&mut self, unit: u8, media: Option<MediaRef>) {
        let Some(index) = drive_index(unit) else {
            debug!("ignoring attach to unit {unit}");
            return;
        };
        if let Some(kind) = media.as_ref().and_then(MediaRef::kind)
            && kind != MediaKind::Disk
        {
            warn!("refusing to attach {kind:?} image to unit {unit}");
            return;
        }
        self.config.disks[index].clone_from(&media);
        if let Some(staged) = &mut self.staged {
            staged.disks[index].clone_from(&media);
        }
        self.send(Command::Attach { unit, media });
    }

    pub fn freeze(&self) {
        self.send(Command::Freeze);
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Asks the simulation thread to stop after everything queued so far.
    pub fn quit(&mut self) {
        if self.state == SessionState::Running {
            self.send(Command::Quit);
            self.state = SessionState::Stopping;
            info!("session stopping");
        }
    }

    pub fn play_pause(&self, running: bool) {
        self.send(Command::PlayPause { running });
    }

    pub fn set_resource(&self, name: impl Into<String>, value: impl Into<ResourceValue>) {
        self.send(Command::SetResource {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Sends the button state of joystick `port` (1..=9) if it changed.
    pub fn joystick(&mut self, port: usize, buttons: JoystickButtons) {
        if port == 0 || port >= JOYSTICK_PORTS || self.joysticks[port] == buttons {
            return;
        }
        self.joysticks[port] = buttons;
        self.send(Command::Joystick { port, buttons });
    }

    pub fn mouse_moved(&self, dx: i32, dy: i32) {
        self.shared.pointer.moved(dx, dy);
    }

    pub fn mouse_set_x(&self, x: u16) {
        self.shared.pointer.set_x(x);
    }

    pub fn mouse_set_y(&self, y: u16) {
        self.shared.pointer.set_y(y);
    }

    pub fn mouse_pressed(&self, button: MouseButton) {
        self.send(Command::MouseButton {
            button,
            pressed: true,
        });
    }

    pub fn mouse_released(&self, button: MouseButton) {
        self.send(Command::MouseButton {
            button,
            pressed: false,
        });
    }

    pub fn light_pen(&self, pen: LightPen) {
        self.shared.pointer.set_light_pen(pen);
    }

    /// The polling tick: reports changed drive and tape status to the
    /// observer and notices a simulation thread that has ended. Returns
    /// the number of status callbacks made.
    pub fn poll(&mut self) -> usize {
        let published = match self.observer.as_ref().and_then(Weak::upgrade) {
            Some(observer) => self
                .status
                .publish_changes(&self.shared.status, observer.as_ref()),
            None => 0,
        };

        if self.thread.as_ref().is_some_and(JoinHandle::is_finished) {
            if self.state == SessionState::Running {
                warn!("simulation thread ended on its own");
            }
            self.join();
        }
        published
    }

    /// Blocks until the simulation thread has ended. Returns at once
    /// without a `quit`.
    pub fn wait(&mut self) {
        if self.state == SessionState::Stopping {
            self.join();
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("simulation thread panicked");
        }
        self.state = SessionState::Idle;
        info!("session idle");
    }

    fn send(&self, command: Command) {
        debug!("queueing {command:?}");
        self.shared.queue.enqueue(command);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.quit();
        self.wait();
    }
}
