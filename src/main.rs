use std::{
    env, error, fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    thread,
    time::Duration,
};

use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use host::{
    Session, StatusObserver,
    session::{TYPE_GAP_FRAMES, TYPE_HOLD_FRAMES},
};
use machine::{
    command::MouseButton,
    engine::{Engine, EngineError, FrameContext, FrameReport, Launch},
    media::{DRIVE_COUNT, MachineConfig, NoCatalog, drive_index},
    resource::ResourceValue,
    status::{DriveStatus, TapeStatus},
};

/// Polling tick of the control thread, one PAL frame.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Ticks to keep running once everything has been typed.
const SETTLE_TICKS: u32 = 100;
/// Frames a drive stays busy after a disk is inserted.
const DRIVE_BUSY_FRAMES: u32 = 25;
/// Directory track of a 1541 disk.
const DIRECTORY_TRACK: f64 = 18.0;

/// Engine stand-in for running without an emulation core: it paces
/// frames in real time and logs what it is asked to do.
#[derive(Debug, Default)]
struct TraceEngine {
    frames: u64,
    busy: [u32; DRIVE_COUNT],
}

impl Engine for TraceEngine {
    fn boot(&mut self, launch: &Launch) -> Result<(), EngineError> {
        info!("booting with {:?}", launch.argv);
        for (name, value) in &launch.resources {
            debug!("resource {name} = {value}");
        }
        Ok(())
    }

    fn run_frame(&mut self, frame: &FrameContext<'_>) -> FrameReport {
        for (drive, busy) in self.busy.iter_mut().enumerate() {
            if *busy > 0 {
                *busy -= 1;
                frame.status.drive_track(drive, DIRECTORY_TRACK);
                frame.status.drive_leds(drive, 1.0, 0.0);
            } else {
                frame.status.drive_leds(drive, 0.0, 0.0);
            }
        }
        self.frames += 1;
        thread::sleep(POLL_INTERVAL);
        FrameReport::Continue
    }

    fn attach_disk(&mut self, unit: u8, image: Option<&Path>) {
        info!("unit {unit}: {image:?}");
        if let Some(drive) = drive_index(unit)
            && image.is_some()
        {
            self.busy[drive] = DRIVE_BUSY_FRAMES;
        }
    }

    fn trigger_freeze(&mut self) {
        info!("freeze");
    }

    fn trigger_reset(&mut self) {
        info!("reset");
    }

    fn set_joystick(&mut self, port: usize, value: u8) {
        debug!("joystick {port}: {value:#04x}");
    }

    fn set_key(&mut self, row: u8, column: u8, pressed: bool) {
        debug!("key ({row}, {column}) pressed={pressed}");
    }

    fn set_restore(&mut self, pressed: bool) {
        debug!("restore pressed={pressed}");
    }

    fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        debug!("mouse {button:?} pressed={pressed}");
    }

    fn set_resource(&mut self, name: &str, value: &ResourceValue) {
        info!("resource {name} = {value}");
    }

    fn inject_memory(&mut self, address: u16, value: u8) {
        debug!("poke {address:#06x}, {value:#04x}");
    }

    fn set_drive_id(&mut self, unit: u8, id: [u8; 2]) {
        debug!("unit {unit} id {id:?}");
    }

    fn shutdown(&mut self) {
        info!("ran {} frames", self.frames);
    }
}

struct LogObserver;

impl StatusObserver for LogObserver {
    fn update_drive_status(&self, unit: u8, status: &DriveStatus) {
        info!(
            "drive {unit}: track {:.1}, {}",
            status.track,
            if status.is_active() { "busy" } else { "idle" }
        );
    }

    fn update_tape_status(&self, status: &TapeStatus) {
        let counter: String = status
            .odometer(3)
            .iter()
            .map(|digit| char::from(b'0' + digit.digit))
            .collect();
        info!(
            "tape: {:?} motor={} counter {counter}",
            status.control, status.motor_on
        );
    }
}

fn main() {
    let _guard = init_tracing();

    let args = env::args().skip(1).collect::<Vec<String>>();
    let Some(config_path) = args.first() else {
        eprintln!("usage: c64 <machine.json> [text-to-type]");
        process::exit(1)
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{config_path}: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = run(config, args.get(1).map(String::as_str)) {
        eprintln!("{e}");
        process::exit(3);
    }
}

fn run(config: MachineConfig, text: Option<&str>) -> Result<(), Box<dyn error::Error>> {
    let mut session = Session::new(config);
    let observer: Arc<dyn StatusObserver> = Arc::new(LogObserver);
    session.set_observer(&observer);
    session.start(TraceEngine::default(), &NoCatalog)?;

    let mut ticks = SETTLE_TICKS;
    if let Some(text) = text {
        session.type_text(text);
        let strokes = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        ticks = ticks.saturating_add(strokes.saturating_mul(TYPE_HOLD_FRAMES + TYPE_GAP_FRAMES));
    }

    for _ in 0..ticks {
        session.poll();
        thread::sleep(POLL_INTERVAL);
    }

    session.quit();
    session.wait();
    session.poll();
    Ok(())
}

fn load_config(path: impl AsRef<Path>) -> Result<MachineConfig, Box<dyn error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Logs to stderr and to `c64.log` in the temp directory. The returned
/// guard flushes the file when dropped.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir: PathBuf = env::temp_dir();
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, "c64.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}
