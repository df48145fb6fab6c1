use serde::{Deserialize, Serialize};

use crate::{joystick::JoystickButtons, key::Key, media::MediaRef, resource::ResourceValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A request from the control thread, applied by the simulation thread
/// at the start of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Insert `media` into drive `unit` (8..=11), eject on `None`.
    Attach {
        unit: u8,
        media: Option<MediaRef>,
    },
    Freeze,
    Reset,
    Quit,
    /// Matrix key transition, applied after `delay` further frames.
    Key {
        key: Key,
        pressed: bool,
        delay: u32,
    },
    Joystick {
        port: usize,
        buttons: JoystickButtons,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    Restore {
        pressed: bool,
    },
    SetResource {
        name: String,
        value: ResourceValue,
    },
    PlayPause {
        running: bool,
    },
}

impl Command {
    /// Frames left before the command is due.
    #[must_use]
    pub const fn delay(&self) -> u32 {
        match self {
            Self::Key { delay, .. } => *delay,
            _ => 0,
        }
    }

    /// The command to schedule for the next frame if it is not due yet.
    #[must_use]
    pub fn deferred(&self) -> Option<Self> {
        match *self {
            Self::Key {
                key,
                pressed,
                delay,
            } if delay > 0 => Some(Self::Key {
                key,
                pressed,
                delay: delay - 1,
            }),
            _ => None,
        }
    }
}
