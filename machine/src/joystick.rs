use serde::{Deserialize, Serialize};

/// Number of joystick slots. Slot 0 is unused, ports are numbered from 1.
pub const JOYSTICK_PORTS: usize = 10;

/// Direction and fire state of one joystick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoystickButtons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub fire2: bool,
    pub fire3: bool,
}

impl JoystickButtons {
    /// Bit mask written to the joystick port (set bit = active).
    #[must_use]
    pub const fn value(self) -> u8 {
        let mut value = 0;
        if self.up {
            value |= 0x01;
        }
        if self.down {
            value |= 0x02;
        }
        if self.left {
            value |= 0x04;
        }
        if self.right {
            value |= 0x08;
        }
        if self.fire {
            value |= 0x10;
        }
        if self.fire2 {
            value |= 0x20;
        }
        if self.fire3 {
            value |= 0x40;
        }
        value
    }
}
