//! Named configuration resources of the emulation engine.
//!
//! Names and values are passed through untouched; the engine's own
//! configuration system decides whether a pair is valid.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const AUTOSTART_PRG_MODE: &str = "AutostartPrgMode";
pub const MOUSE: &str = "Mouse";
pub const LOG_FILE_NAME: &str = "LogFileName";
pub const CARTRIDGE_FILE: &str = "CartridgeFile";
pub const CARTRIDGE_EEPROM_IMAGE: &str = "CartridgeEEPROMImage";
pub const REU: &str = "REU";
pub const REU_FILE_NAME: &str = "REUfilename";

/// `AutostartPrgMode` value: inject the program straight into memory.
pub const AUTOSTART_PRG_MODE_INJECT: i64 = 1;
/// `DriveNIdleMethod` value: trap the drive's idle loop.
pub const DRIVE_IDLE_TRAP_IDLE: i64 = 2;

/// `Drive<unit>IdleMethod`
#[must_use]
pub fn drive_idle_method(unit: u8) -> String {
    format!("Drive{unit}IdleMethod")
}

/// `IDE64Image<slot>`, slots are numbered from 1.
#[must_use]
pub fn ide64_image(slot: usize) -> String {
    format!("IDE64Image{slot}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl From<bool> for ResourceValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ResourceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for ResourceValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for ResourceValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", u8::from(*value)),
            Self::Int(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "\"{value}\""),
        }
    }
}
