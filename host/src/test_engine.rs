//! An engine that records what the simulation thread asks of it.

use std::{
    mem,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use machine::{
    command::MouseButton,
    engine::{Engine, EngineError, FrameContext, FrameReport, Launch, PointerSnapshot, StatusSink},
    resource::ResourceValue,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Boot(Launch),
    Attach(u8, Option<PathBuf>),
    Freeze,
    Reset,
    Joystick(usize, u8),
    /// `frame` is the number of frames run before the key was applied.
    Key {
        row: u8,
        column: u8,
        pressed: bool,
        frame: usize,
    },
    Restore(bool),
    Mouse(MouseButton, bool),
    Resource(String, ResourceValue),
    Poke(u16, u8),
    DriveId(u8, [u8; 2]),
    Shutdown,
}

pub fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the engine");
        thread::sleep(Duration::from_millis(1));
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn take(&self) -> Vec<Call> {
        mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn wait_for(&self, done: impl Fn(&[Call]) -> bool) {
        wait_until(|| done(&self.0.lock().unwrap()));
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameCounter(Arc<AtomicUsize>);

impl FrameCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn wait_for(&self, frames: usize) {
        wait_until(|| self.get() >= frames);
    }
}

type StatusScript = fn(usize, &dyn StatusSink);

#[derive(Default)]
pub struct RecordingEngine {
    calls: CallLog,
    frames: FrameCounter,
    pointer: Arc<Mutex<PointerSnapshot>>,
    fail_boot: bool,
    autostart_frame: Option<usize>,
    status_script: Option<StatusScript>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_boot() -> Self {
        Self {
            fail_boot: true,
            ..Self::default()
        }
    }

    /// Reports an autostart injection at the end of frame `frame`.
    pub fn autostart_on_frame(mut self, frame: usize) -> Self {
        self.autostart_frame = Some(frame);
        self
    }

    /// Runs `script` with the frame number during every frame.
    pub fn with_status(mut self, script: StatusScript) -> Self {
        self.status_script = Some(script);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn frames(&self) -> FrameCounter {
        self.frames.clone()
    }

    /// The pointer state the last frame ran with.
    pub fn pointer(&self) -> Arc<Mutex<PointerSnapshot>> {
        Arc::clone(&self.pointer)
    }
}

impl Engine for RecordingEngine {
    fn boot(&mut self, launch: &Launch) -> Result<(), EngineError> {
        if self.fail_boot {
            return Err(EngineError::Boot("no kernal".to_string()));
        }
        self.calls.push(Call::Boot(launch.clone()));
        Ok(())
    }

    fn run_frame(&mut self, frame: &FrameContext<'_>) -> FrameReport {
        let number = self.frames.get();
        if let Some(script) = self.status_script {
            script(number, frame.status);
        }
        *self.pointer.lock().unwrap() = frame.pointer;
        thread::sleep(Duration::from_micros(50));
        self.frames.0.fetch_add(1, Ordering::SeqCst);

        if self.autostart_frame == Some(number) {
            FrameReport::AutostartInjected
        } else {
            FrameReport::Continue
        }
    }

    fn attach_disk(&mut self, unit: u8, image: Option<&Path>) {
        self.calls.push(Call::Attach(unit, image.map(Path::to_path_buf)));
    }

    fn trigger_freeze(&mut self) {
        self.calls.push(Call::Freeze);
    }

    fn trigger_reset(&mut self) {
        self.calls.push(Call::Reset);
    }

    fn set_joystick(&mut self, port: usize, value: u8) {
        self.calls.push(Call::Joystick(port, value));
    }

    fn set_key(&mut self, row: u8, column: u8, pressed: bool) {
        self.calls.push(Call::Key {
            row,
            column,
            pressed,
            frame: self.frames.get(),
        });
    }

    fn set_restore(&mut self, pressed: bool) {
        self.calls.push(Call::Restore(pressed));
    }

    fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.calls.push(Call::Mouse(button, pressed));
    }

    fn set_resource(&mut self, name: &str, value: &ResourceValue) {
        self.calls
            .push(Call::Resource(name.to_string(), value.clone()));
    }

    fn inject_memory(&mut self, address: u16, value: u8) {
        self.calls.push(Call::Poke(address, value));
    }

    fn set_drive_id(&mut self, unit: u8, id: [u8; 2]) {
        self.calls.push(Call::DriveId(unit, id));
    }

    fn shutdown(&mut self) {
        self.calls.push(Call::Shutdown);
    }
}
