//! The interface of the external emulation engine.
//!
//! The engine owns the actual machine (CPU, VIC-II, SID, drives). The
//! simulation thread calls into it once per frame and translates drained
//! [`Command`](crate::command::Command)s into the calls below.

use std::{collections::BTreeMap, path::Path};

use thiserror::Error;

use crate::{command::MouseButton, resource::ResourceValue, status::TapeControl};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine refused to boot: {0}")]
    Boot(String),
}

/// What the engine is booted with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Launch {
    /// Command line, starting with the program name.
    pub argv: Vec<String>,
    pub resources: BTreeMap<String, ResourceValue>,
}

/// Receives device status from the engine, at any rate.
///
/// Drives are addressed by slot 0..=3 (units 8..=11).
pub trait StatusSink {
    fn drive_track(&self, drive: usize, track: f64);
    fn drive_leds(&self, drive: usize, led1: f64, led2: f64);
    fn tape_counter(&self, counter: f64);
    fn tape_control(&self, control: TapeControl);
    fn tape_motor(&self, on: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPen {
    /// Pen position on the screen view, `None` while lifted.
    pub position: Option<(i32, i32)>,
    /// Size of the screen view the position refers to.
    pub size: (i32, i32),
    pub button1: bool,
    pub button2: bool,
    pub koala_pad: bool,
}

impl Default for LightPen {
    fn default() -> Self {
        Self {
            position: None,
            size: (1, 1),
            button1: false,
            button2: false,
            koala_pad: false,
        }
    }
}

impl LightPen {
    /// Position and size as the engine expects them, (-1, -1) on a 1x1
    /// view while the pen is lifted.
    #[must_use]
    pub const fn engine_coordinates(&self) -> ((i32, i32), (i32, i32)) {
        match self.position {
            Some(position) => (position, self.size),
            None => ((-1, -1), (1, 1)),
        }
    }
}

/// Pointer devices as seen at the start of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerSnapshot {
    pub mouse_x: u16,
    pub mouse_y: u16,
    /// Time of the last relative movement, microseconds since session start.
    pub mouse_timestamp: u64,
    pub light_pen: LightPen,
}

pub struct FrameContext<'a> {
    pub status: &'a dyn StatusSink,
    pub pointer: PointerSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameReport {
    Continue,
    /// Autostart has just injected the program into memory.
    AutostartInjected,
}

pub trait Engine: Send {
    fn boot(&mut self, launch: &Launch) -> Result<(), EngineError>;

    /// Emulates one video frame.
    fn run_frame(&mut self, frame: &FrameContext<'_>) -> FrameReport;

    fn attach_disk(&mut self, unit: u8, image: Option<&Path>);
    fn trigger_freeze(&mut self);
    fn trigger_reset(&mut self);
    fn set_joystick(&mut self, port: usize, value: u8);
    fn set_key(&mut self, row: u8, column: u8, pressed: bool);
    fn set_restore(&mut self, pressed: bool);
    fn mouse_button(&mut self, button: MouseButton, pressed: bool);
    fn set_resource(&mut self, name: &str, value: &ResourceValue);
    fn inject_memory(&mut self, address: u16, value: u8);
    fn set_drive_id(&mut self, unit: u8, id: [u8; 2]);

    /// Called once when the run loop ends.
    fn shutdown(&mut self) {}
}
