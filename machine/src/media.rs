use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::resource::ResourceValue;

/// Logical unit number of the first disk drive.
pub const FIRST_DRIVE_UNIT: u8 = 8;
/// Number of disk drives (units 8..=11).
pub const DRIVE_COUNT: usize = 4;
/// Number of IDE64 image slots.
pub const IDE_SLOTS: usize = 4;

/// Array index of a logical drive unit, `None` outside 8..=11.
#[must_use]
pub fn drive_index(unit: u8) -> Option<usize> {
    let index = usize::from(unit.checked_sub(FIRST_DRIVE_UNIT)?);
    (index < DRIVE_COUNT).then_some(index)
}

/// Logical drive unit of an array index.
#[must_use]
pub fn drive_unit(index: usize) -> Option<u8> {
    if index < DRIVE_COUNT {
        u8::try_from(index).ok().map(|i| i + FIRST_DRIVE_UNIT)
    } else {
        None
    }
}

/// Opaque handle to a disk, tape, cartridge or program image.
///
/// The bridge never looks inside the image, it only hands the path to
/// the engine or to a [`DiskCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(PathBuf);

impl MediaRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_path(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Disk,
    Tape,
    Cartridge,
    ProgramFile,
    RamExpansion,
    IdeDisk,
}

impl MediaKind {
    /// Classifies an image by its file extension (case insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        let kind = match extension.as_str() {
            "d64" | "d71" | "d81" | "d80" | "d82" | "g64" | "g71" | "p64" | "x64" => Self::Disk,
            "tap" | "t64" => Self::Tape,
            "crt" | "bin" => Self::Cartridge,
            "prg" | "p00" => Self::ProgramFile,
            "reu" => Self::RamExpansion,
            "cfa" | "hdd" | "iso" => Self::IdeDisk,
            _ => return None,
        };
        Some(kind)
    }
}

/// A cartridge image with its optional EEPROM companion file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeMedia {
    pub image: MediaRef,
    #[serde(default)]
    pub eeprom: Option<MediaRef>,
}

/// How media get into the staging directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
    #[default]
    Copy,
    /// The originals are taken away, as when importing into a library.
    Move,
}

/// Media and resources a session is started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub autostart: bool,
    pub program_file: Option<MediaRef>,
    pub tapes: Vec<MediaRef>,
    pub disks: [Option<MediaRef>; DRIVE_COUNT],
    pub cartridge: Option<CartridgeMedia>,
    pub ram_expansion: Option<MediaRef>,
    pub ide_disks: Vec<MediaRef>,
    /// Media are copied here before launch when set.
    pub staging_dir: Option<PathBuf>,
    pub stage_mode: StageMode,
    /// Where the program extracted from an autostart disk is written.
    pub scratch_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub resources: BTreeMap<String, ResourceValue>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            autostart: true,
            program_file: None,
            tapes: Vec::new(),
            disks: Default::default(),
            cartridge: None,
            ram_expansion: None,
            ide_disks: Vec::new(),
            staging_dir: None,
            stage_mode: StageMode::Copy,
            scratch_dir: None,
            log_file: None,
            resources: BTreeMap::new(),
        }
    }
}

impl MachineConfig {
    /// The tape that gets inserted, the first configured one.
    #[must_use]
    pub fn tape(&self) -> Option<&MediaRef> {
        self.tapes.first()
    }
}

/// One entry of a disk directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// File name in PETSCII.
    pub name: Vec<u8>,
    /// CBM DOS file type: 0 DEL, 1 SEQ, 2 PRG, 3 USR, 4 REL.
    pub file_type: u8,
    /// False for splat files (not properly closed).
    pub closed: bool,
    pub track: u8,
    pub sector: u8,
}

impl DirectoryEntry {
    pub const PRG: u8 = 2;

    #[must_use]
    pub const fn is_loadable_program(&self) -> bool {
        self.closed && self.file_type == Self::PRG
    }
}

/// Read access to disk images, provided by the image format layer.
pub trait DiskCatalog {
    fn directory(&self, image: &MediaRef) -> Option<Vec<DirectoryEntry>>;

    /// Contents of the file starting at `track`/`sector`.
    fn read_file(&self, image: &MediaRef, track: u8, sector: u8) -> Option<Vec<u8>>;

    /// The two byte disk id from the BAM.
    fn disk_id(&self, image: &MediaRef) -> Option<[u8; 2]>;
}

/// Catalog for hosts without an image format layer: every disk reads as
/// unknown, so disk autostart falls back to a plain attach.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCatalog;

impl DiskCatalog for NoCatalog {
    fn directory(&self, _image: &MediaRef) -> Option<Vec<DirectoryEntry>> {
        None
    }

    fn read_file(&self, _image: &MediaRef, _track: u8, _sector: u8) -> Option<Vec<u8>> {
        None
    }

    fn disk_id(&self, _image: &MediaRef) -> Option<[u8; 2]> {
        None
    }
}
