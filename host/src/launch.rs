//! Building the engine's command line and boot resources from a
//! [`MachineConfig`].
//!
//! Autostart goes to at most one medium, in this order: program file,
//! tape, the first loadable program found on a disk, a plain disk. Once
//! a medium claims it, the others are attached without `-autostart`.

use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::{info, warn};

use machine::{
    engine::Launch,
    media::{
        DRIVE_COUNT, DiskCatalog, FIRST_DRIVE_UNIT, IDE_SLOTS, MachineConfig, MediaRef,
        drive_unit,
    },
    resource::{self, ResourceValue},
};

/// Where the kernal expects the file name of the program being loaded.
const FILE_NAME_ADDRESS: u16 = 0x0230;
/// Load address every autostartable BASIC program starts with.
const BASIC_START: [u8; 2] = [0x01, 0x08];

static TEMP_PROGRAMS: AtomicUsize = AtomicUsize::new(0);

/// A program file extracted from a disk, deleted when dropped.
#[derive(Debug)]
pub struct TempProgram {
    path: PathBuf,
}

impl TempProgram {
    fn write(directory: &Path, data: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(directory)?;
        let serial = TEMP_PROGRAMS.fetch_add(1, Ordering::Relaxed);
        let path = directory.join(format!("autostart-{}-{serial}.prg", process::id()));
        fs::write(&path, data)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempProgram {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!("could not remove {}: {err}", self.path.display());
        }
    }
}

/// The program autostart will inject from a disk.
#[derive(Debug)]
pub struct AutostartProgram {
    /// PETSCII file name as listed in the directory.
    pub name: Vec<u8>,
    /// Id of the disk in unit 8, restored after injection.
    pub disk_id: Option<[u8; 2]>,
    pub file: TempProgram,
}

impl AutostartProgram {
    /// Zero page writes that make the injected program look as if it
    /// had been loaded with `LOAD"name",8,1`.
    #[must_use]
    pub fn device_info_pokes(&self) -> Vec<(u16, u8)> {
        device_info_pokes(&self.name)
    }
}

#[derive(Debug)]
pub struct LaunchPlan {
    pub launch: Launch,
    pub autostart_program: Option<AutostartProgram>,
}

#[must_use]
pub fn device_info_pokes(name: &[u8]) -> Vec<(u16, u8)> {
    let [address_low, address_high] = FILE_NAME_ADDRESS.to_le_bytes();
    let mut pokes = vec![
        (0x00b7, u8::try_from(name.len()).unwrap_or(u8::MAX)),
        // logical file number
        (0x00b8, 96),
        // secondary address
        (0x00b9, 1),
        // device number
        (0x00ba, FIRST_DRIVE_UNIT),
        (0x00bb, address_low),
        (0x00bc, address_high),
    ];
    pokes.extend(
        (FILE_NAME_ADDRESS..)
            .zip(name)
            .map(|(address, &byte)| (address, byte)),
    );
    pokes
}

/// Resources the engine boots with: fixed defaults, those implied by
/// the configured media, then the user's own.
#[must_use]
pub fn boot_resources(config: &MachineConfig) -> BTreeMap<String, ResourceValue> {
    let mut resources = BTreeMap::new();
    resources.insert(
        resource::AUTOSTART_PRG_MODE.to_string(),
        resource::AUTOSTART_PRG_MODE_INJECT.into(),
    );
    resources.insert(resource::MOUSE.to_string(), true.into());
    for unit in (0..DRIVE_COUNT).filter_map(drive_unit) {
        resources.insert(
            resource::drive_idle_method(unit),
            resource::DRIVE_IDLE_TRAP_IDLE.into(),
        );
    }

    if let Some(log_file) = &config.log_file {
        resources.insert(resource::LOG_FILE_NAME.to_string(), path_value(log_file));
    }
    if let Some(cartridge) = &config.cartridge {
        resources.insert(
            resource::CARTRIDGE_FILE.to_string(),
            path_value(cartridge.image.path()),
        );
        if let Some(eeprom) = &cartridge.eeprom {
            resources.insert(
                resource::CARTRIDGE_EEPROM_IMAGE.to_string(),
                path_value(eeprom.path()),
            );
        }
    }
    if let Some(reu) = &config.ram_expansion {
        resources.insert(resource::REU.to_string(), true.into());
        resources.insert(resource::REU_FILE_NAME.to_string(), path_value(reu.path()));
    }
    for (slot, image) in (1..=IDE_SLOTS).zip(&config.ide_disks) {
        resources.insert(resource::ide64_image(slot), path_value(image.path()));
    }

    resources.extend(
        config
            .resources
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    resources
}

#[must_use]
pub fn plan_launch(config: &MachineConfig, catalog: &dyn DiskCatalog) -> LaunchPlan {
    let mut argv = vec!["vice".to_string()];
    let mut autostart = config.autostart;
    let mut autostart_program = None;

    if let Some(program) = &config.program_file {
        argv.push("-autostart".to_string());
        argv.push(path_arg(program.path()));
        autostart = false;
    }

    if let Some(tape) = config.tape() {
        argv.push(if autostart { "-autostart" } else { "-1" }.to_string());
        argv.push(path_arg(tape.path()));
        autostart = false;
    }

    let scratch = config.scratch_dir.clone().unwrap_or_else(env::temp_dir);
    for (index, disk) in config.disks.iter().enumerate() {
        let Some(disk) = disk else {
            continue;
        };

        if autostart && let Some(program) = extract_program(disk, catalog, &scratch) {
            argv.push("-autostart".to_string());
            argv.push(path_arg(program.file.path()));
            autostart = false;
            autostart_program = Some(AutostartProgram {
                disk_id: config.disks[0]
                    .as_ref()
                    .and_then(|first| catalog.disk_id(first)),
                ..program
            });
        }

        if autostart {
            argv.push("-autostart".to_string());
            autostart = false;
        } else {
            argv.push(format!("-{}", index + usize::from(FIRST_DRIVE_UNIT)));
        }
        argv.push(path_arg(disk.path()));
    }

    info!("launching {argv:?}");
    LaunchPlan {
        launch: Launch {
            argv,
            resources: boot_resources(config),
        },
        autostart_program,
    }
}

/// The first loadable program on `disk`, written to `scratch`, if it
/// loads at the start of BASIC.
fn extract_program(
    disk: &MediaRef,
    catalog: &dyn DiskCatalog,
    scratch: &Path,
) -> Option<AutostartProgram> {
    let directory = catalog.directory(disk)?;
    let entry = directory.iter().find(|entry| entry.is_loadable_program())?;
    let data = catalog.read_file(disk, entry.track, entry.sector)?;
    if data.len() <= 2 || !data.starts_with(&BASIC_START) {
        return None;
    }

    match TempProgram::write(scratch, &data) {
        Ok(file) => Some(AutostartProgram {
            name: entry.name.clone(),
            disk_id: None,
            file,
        }),
        Err(err) => {
            warn!(
                "could not extract autostart program from {}: {err}",
                disk.path().display()
            );
            None
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn path_value(path: &Path) -> ResourceValue {
    ResourceValue::String(path_arg(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use machine::media::{CartridgeMedia, DirectoryEntry};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeCatalog {
        entries: Vec<DirectoryEntry>,
        data: Vec<u8>,
        id: Option<[u8; 2]>,
    }

    impl DiskCatalog for FakeCatalog {
        fn directory(&self, _image: &MediaRef) -> Option<Vec<DirectoryEntry>> {
            Some(self.entries.clone())
        }

        fn read_file(&self, _image: &MediaRef, track: u8, _sector: u8) -> Option<Vec<u8>> {
            (track == 17).then(|| self.data.clone())
        }

        fn disk_id(&self, _image: &MediaRef) -> Option<[u8; 2]> {
            self.id
        }
    }

    fn entry(name: &[u8], file_type: u8, closed: bool, track: u8) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_vec(),
            file_type,
            closed,
            track,
            sector: 0,
        }
    }

    fn scratch_dir(test: &str) -> PathBuf {
        env::temp_dir().join(format!("c64-launch-{}-{test}", process::id()))
    }

    fn args(plan: &LaunchPlan) -> Vec<&str> {
        plan.launch.argv.iter().map(String::as_str).collect()
    }

    #[test]
    fn program_file_wins_over_disk() {
        let config = MachineConfig {
            program_file: Some(MediaRef::new("game.prg")),
            disks: [Some(MediaRef::new("disk.d64")), None, None, None],
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &machine::media::NoCatalog);
        assert_eq!(
            args(&plan),
            vec!["vice", "-autostart", "game.prg", "-8", "disk.d64"]
        );
        assert!(plan.autostart_program.is_none());
    }

    #[test]
    fn program_file_autostarts_even_when_autostart_is_off() {
        let config = MachineConfig {
            autostart: false,
            program_file: Some(MediaRef::new("game.prg")),
            tapes: vec![MediaRef::new("tape.tap")],
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &machine::media::NoCatalog);
        assert_eq!(
            args(&plan),
            vec!["vice", "-autostart", "game.prg", "-1", "tape.tap"]
        );
    }

    #[test]
    fn tape_wins_over_disk() {
        let config = MachineConfig {
            tapes: vec![MediaRef::new("a.tap"), MediaRef::new("b.tap")],
            disks: [None, Some(MediaRef::new("disk.d64")), None, None],
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &machine::media::NoCatalog);
        assert_eq!(
            args(&plan),
            vec!["vice", "-autostart", "a.tap", "-9", "disk.d64"]
        );
    }

    #[test]
    fn first_disk_autostarts_without_catalog() {
        let config = MachineConfig {
            disks: [
                Some(MediaRef::new("one.d64")),
                Some(MediaRef::new("two.d64")),
                None,
                None,
            ],
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &machine::media::NoCatalog);
        assert_eq!(
            args(&plan),
            vec!["vice", "-autostart", "one.d64", "-9", "two.d64"]
        );
    }

    #[test]
    fn no_autostart_attaches_plainly() {
        let config = MachineConfig {
            autostart: false,
            disks: [None, None, None, Some(MediaRef::new("x.d64"))],
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &machine::media::NoCatalog);
        assert_eq!(args(&plan), vec!["vice", "-11", "x.d64"]);
    }

    #[test]
    fn disk_program_is_extracted_for_injection() {
        let scratch = scratch_dir("extract");
        let catalog = FakeCatalog {
            entries: vec![
                entry(b"NOTES", 1, true, 18),
                entry(b"BROKEN", DirectoryEntry::PRG, false, 19),
                entry(b"GAME", DirectoryEntry::PRG, true, 17),
                entry(b"OTHER", DirectoryEntry::PRG, true, 20),
            ],
            data: vec![0x01, 0x08, 0x0b, 0x08],
            id: Some(*b"AB"),
        };
        let config = MachineConfig {
            disks: [Some(MediaRef::new("disk.d64")), None, None, None],
            scratch_dir: Some(scratch.clone()),
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &catalog);
        let program = plan.autostart_program.as_ref().unwrap();
        let temp = program.file.path().to_path_buf();

        assert_eq!(program.name, b"GAME".to_vec());
        assert_eq!(program.disk_id, Some(*b"AB"));
        assert!(temp.starts_with(&scratch));
        assert_eq!(fs::read(&temp).unwrap(), catalog.data);
        assert_eq!(
            args(&plan),
            vec![
                "vice",
                "-autostart",
                temp.to_str().unwrap(),
                "-8",
                "disk.d64"
            ]
        );

        drop(plan);
        assert!(!temp.exists());
        fs::remove_dir_all(&scratch).unwrap();
    }

    #[test]
    fn program_not_loading_at_basic_start_falls_back_to_disk() {
        let scratch = scratch_dir("fallback");
        let catalog = FakeCatalog {
            entries: vec![entry(b"ML", DirectoryEntry::PRG, true, 17)],
            data: vec![0x00, 0xc0, 0xea],
            id: None,
        };
        let config = MachineConfig {
            disks: [Some(MediaRef::new("disk.d64")), None, None, None],
            scratch_dir: Some(scratch.clone()),
            ..MachineConfig::default()
        };

        let plan = plan_launch(&config, &catalog);
        assert!(plan.autostart_program.is_none());
        assert_eq!(args(&plan), vec!["vice", "-autostart", "disk.d64"]);
        assert!(!scratch.exists());
    }

    #[test]
    fn load_address_alone_is_not_a_program() {
        let catalog = FakeCatalog {
            entries: vec![entry(b"EMPTY", DirectoryEntry::PRG, true, 17)],
            data: vec![0x01, 0x08],
            id: None,
        };
        let config = MachineConfig {
            disks: [Some(MediaRef::new("disk.d64")), None, None, None],
            scratch_dir: Some(scratch_dir("empty")),
            ..MachineConfig::default()
        };

        assert!(plan_launch(&config, &catalog).autostart_program.is_none());
    }

    #[test]
    fn injection_pokes_describe_a_device_eight_load() {
        assert_eq!(
            device_info_pokes(b"HI"),
            vec![
                (0x00b7, 2),
                (0x00b8, 96),
                (0x00b9, 1),
                (0x00ba, 8),
                (0x00bb, 0x30),
                (0x00bc, 0x02),
                (0x0230, b'H'),
                (0x0231, b'I'),
            ]
        );
    }

    #[test]
    fn boot_resources_follow_media_and_user_overrides() {
        let mut config = MachineConfig {
            cartridge: Some(CartridgeMedia {
                image: MediaRef::new("cart.crt"),
                eeprom: Some(MediaRef::new("cart.eeprom")),
            }),
            ram_expansion: Some(MediaRef::new("ram.reu")),
            ide_disks: (1..=5)
                .map(|n| MediaRef::new(format!("ide{n}.hdd")))
                .collect(),
            log_file: Some(PathBuf::from("vice.log")),
            ..MachineConfig::default()
        };
        config
            .resources
            .insert(resource::MOUSE.to_string(), false.into());

        let resources = boot_resources(&config);
        let get = |name: &str| resources.get(name).cloned();

        assert_eq!(get(resource::AUTOSTART_PRG_MODE), Some(ResourceValue::Int(1)));
        assert_eq!(get(resource::MOUSE), Some(ResourceValue::Bool(false)));
        assert_eq!(get("Drive11IdleMethod"), Some(ResourceValue::Int(2)));
        assert_eq!(get(resource::LOG_FILE_NAME), Some("vice.log".into()));
        assert_eq!(get(resource::CARTRIDGE_FILE), Some("cart.crt".into()));
        assert_eq!(
            get(resource::CARTRIDGE_EEPROM_IMAGE),
            Some("cart.eeprom".into())
        );
        assert_eq!(get(resource::REU), Some(ResourceValue::Bool(true)));
        assert_eq!(get("IDE64Image4"), Some("ide4.hdd".into()));
        assert_eq!(get("IDE64Image5"), None);
    }
}
