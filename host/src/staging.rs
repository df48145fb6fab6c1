//! Taking a session's media into a private directory before launch.
//!
//! Every failure here is local to one medium: it is logged, the medium is
//! left out, and the session starts with whatever was staged.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, warn};

use machine::media::{CartridgeMedia, MachineConfig, MediaRef, StageMode};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
    #[error("could not stage {from} as {to}: {source}")]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Returns `config` with every medium replaced by its staged file in
/// `directory`, copied or moved there according to `config.stage_mode`.
///
/// Only the first tape and the first IDE image are staged; disks are
/// staged per drive. A cartridge whose EEPROM cannot be staged is dropped
/// and its image put back. When `directory` cannot be created the media
/// are used from where they are.
#[must_use]
pub fn stage_media(config: &MachineConfig, directory: &Path) -> MachineConfig {
    if let Err(err) = fs::create_dir_all(directory) {
        warn!(
            "could not create staging directory {}: {err}",
            directory.display()
        );
        return config.clone();
    }

    let mode = config.stage_mode;
    let stage = |media: &MediaRef| match stage_file(media.path(), directory, mode) {
        Ok(staged) => Some(MediaRef::new(staged)),
        Err(err) => {
            warn!("skipping medium: {err}");
            None
        }
    };

    MachineConfig {
        program_file: config.program_file.as_ref().and_then(stage),
        tapes: config.tape().and_then(stage).into_iter().collect(),
        disks: config.disks.each_ref().map(|disk| disk.as_ref().and_then(stage)),
        cartridge: config
            .cartridge
            .as_ref()
            .and_then(|cartridge| stage_cartridge(cartridge, directory, mode)),
        ram_expansion: config.ram_expansion.as_ref().and_then(stage),
        ide_disks: config.ide_disks.first().and_then(stage).into_iter().collect(),
        ..config.clone()
    }
}

fn stage_cartridge(
    cartridge: &CartridgeMedia,
    directory: &Path,
    mode: StageMode,
) -> Option<CartridgeMedia> {
    let image = match stage_file(cartridge.image.path(), directory, mode) {
        Ok(image) => image,
        Err(err) => {
            warn!("skipping cartridge: {err}");
            return None;
        }
    };

    let Some(eeprom) = &cartridge.eeprom else {
        return Some(CartridgeMedia {
            image: MediaRef::new(image),
            eeprom: None,
        });
    };

    match stage_file(eeprom.path(), directory, mode) {
        Ok(eeprom) => Some(CartridgeMedia {
            image: MediaRef::new(image),
            eeprom: Some(MediaRef::new(eeprom)),
        }),
        Err(err) => {
            warn!("skipping cartridge, EEPROM not staged: {err}");
            let rollback = match mode {
                StageMode::Copy => fs::remove_file(&image),
                StageMode::Move => move_file(&image, cartridge.image.path()),
            };
            if let Err(err) = rollback {
                warn!("could not roll back {}: {err}", image.display());
            }
            None
        }
    }
}

/// Copies or moves `source` into `directory` under a name not taken yet.
pub fn stage_file(
    source: &Path,
    directory: &Path,
    mode: StageMode,
) -> Result<PathBuf, StageError> {
    match mode {
        StageMode::Copy => transfer(source, directory, |from, to| fs::copy(from, to).map(drop)),
        StageMode::Move => transfer(source, directory, move_file),
    }
}

fn transfer(
    source: &Path,
    directory: &Path,
    place: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> Result<PathBuf, StageError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| StageError::NoFileName(source.to_path_buf()))?;
    let destination = unique_name(directory, Path::new(file_name));

    if let Err(err) = place(source, &destination) {
        // the name was free, so anything there now is our partial copy
        if let Err(remove_err) = fs::remove_file(&destination)
            && remove_err.kind() != io::ErrorKind::NotFound
        {
            warn!(
                "could not remove partial copy {}: {remove_err}",
                destination.display()
            );
        }
        return Err(StageError::Transfer {
            from: source.to_path_buf(),
            to: destination,
            source: err,
        });
    }
    debug!("staged {} as {}", source.display(), destination.display());
    Ok(destination)
}

/// Renames `from` to `to`, copying when they are on different file systems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// `name.ext`, then `name-1.ext`, `name-2.ext`, ... whichever is free.
#[must_use]
pub fn unique_name(directory: &Path, file_name: &Path) -> PathBuf {
    let candidate = directory.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file_name
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| directory.join(format!("{stem}-{n}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}
