use serde::{Deserialize, Serialize};

/// Track and activity LEDs of one disk drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveStatus {
    /// Head position, half tracks show up as fractions.
    pub track: f64,
    /// 0.0 ..= 1.0
    pub led1_intensity: f64,
    /// 0.0 ..= 1.0
    pub led2_intensity: f64,
}

impl Default for DriveStatus {
    fn default() -> Self {
        Self {
            track: 1.0,
            led1_intensity: 0.0,
            led2_intensity: 0.0,
        }
    }
}

impl DriveStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.led1_intensity != 0.0 || self.led2_intensity != 0.0
    }

    /// Where a track indicator draws the head.
    ///
    /// Returns whether the head is on the first side and its position on
    /// that side in 0.0 ..= 1.0. Double sided media number the tracks of
    /// the second side after those of the first one.
    #[must_use]
    pub fn head_position(&self, tracks: u32, double_sided: bool) -> (bool, f64) {
        if tracks == 0 {
            return (true, 0.0);
        }
        let tracks = f64::from(tracks);
        let tracks_per_side = if double_sided { tracks / 2.0 } else { tracks };

        let mut current = (self.track - 1.0).clamp(0.0, tracks - 1.0);
        let on_first_side = current < tracks_per_side;

        if double_sided {
            current = current.rem_euclid(tracks_per_side);
        }

        let position = if tracks_per_side <= 1.0 {
            0.0
        } else {
            current / (tracks_per_side - 1.0)
        };
        (on_first_side, position)
    }
}

/// Datasette button state as reported by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapeControl {
    #[default]
    Stop,
    Start,
    Forward,
    Rewind,
    Record,
}

impl TapeControl {
    /// Maps the engine's numeric control status, unknown values read as stop.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Start,
            2 => Self::Forward,
            3 => Self::Rewind,
            4 => Self::Record,
            _ => Self::Stop,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Start => 1,
            Self::Forward => 2,
            Self::Rewind => 3,
            Self::Record => 4,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapeStatus {
    pub counter: f64,
    pub control: TapeControl,
    pub motor_on: bool,
}

/// One wheel of a mechanical tape counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterDigit {
    pub digit: u8,
    /// How far the wheel has rolled towards the next digit.
    pub fraction: f64,
}

impl TapeStatus {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.motor_on
    }

    /// The record LED.
    #[must_use]
    pub fn led_intensity(&self) -> f64 {
        if self.control == TapeControl::Record {
            1.0
        } else {
            0.0
        }
    }

    /// Wheels of a `digits` wide counter, most significant first.
    ///
    /// A wheel rolls with the counter's fraction only while every less
    /// significant wheel shows 9, like the datasette's odometer.
    #[must_use]
    pub fn odometer(&self, digits: usize) -> Vec<CounterDigit> {
        let counter = self.counter.max(0.0);
        let mut fraction = counter.fract();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut integral = counter.trunc() as u64;

        let mut wheels = vec![
            CounterDigit {
                digit: 0,
                fraction: 0.0
            };
            digits
        ];
        for wheel in wheels.iter_mut().rev() {
            #[allow(clippy::cast_possible_truncation)]
            let digit = (integral % 10) as u8;
            integral /= 10;
            *wheel = CounterDigit { digit, fraction };
            if digit != 9 {
                fraction = 0.0;
            }
        }
        wheels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn idle_drive_sits_on_track_one() {
        let drive = DriveStatus::default();
        assert!(!drive.is_active());
        assert_eq!(drive.head_position(35, false), (true, 0.0));
    }

    #[test]
    fn head_position_single_sided() {
        let drive = DriveStatus {
            track: 18.0,
            ..DriveStatus::default()
        };
        assert_eq!(drive.head_position(35, false), (true, 0.5));

        let past_end = DriveStatus {
            track: 50.0,
            ..DriveStatus::default()
        };
        assert_eq!(past_end.head_position(35, false), (true, 1.0));
    }

    #[test]
    fn head_position_wraps_onto_second_side() {
        let drive = DriveStatus {
            track: 36.0,
            ..DriveStatus::default()
        };
        assert_eq!(drive.head_position(70, true), (false, 0.0));
    }

    #[test]
    fn active_while_any_led_is_lit() {
        let drive = DriveStatus {
            led2_intensity: 0.25,
            ..DriveStatus::default()
        };
        assert!(drive.is_active());
    }

    #[test]
    fn control_status_round_trips_known_values() {
        assert_eq!(TapeControl::from_raw(4), TapeControl::Record);
        assert_eq!(TapeControl::from_raw(9), TapeControl::Stop);
        assert_eq!(TapeControl::Rewind.raw(), 3);
    }

    #[test]
    fn record_lights_the_led() {
        let tape = TapeStatus {
            control: TapeControl::Record,
            ..TapeStatus::default()
        };
        assert_eq!(tape.led_intensity(), 1.0);
        assert_eq!(TapeStatus::default().led_intensity(), 0.0);
    }

    #[test]
    fn odometer_rolls_only_behind_nines() {
        let tape = TapeStatus {
            counter: 199.5,
            ..TapeStatus::default()
        };
        let wheels = tape.odometer(3);
        assert_eq!(
            wheels,
            vec![
                CounterDigit {
                    digit: 1,
                    fraction: 0.5
                },
                CounterDigit {
                    digit: 9,
                    fraction: 0.5
                },
                CounterDigit {
                    digit: 9,
                    fraction: 0.5
                },
            ]
        );

        let tape = TapeStatus {
            counter: 42.25,
            ..TapeStatus::default()
        };
        let wheels = tape.odometer(3);
        assert_eq!(wheels[0].digit, 0);
        assert_eq!(wheels[1].digit, 4);
        assert_eq!(wheels[1].fraction, 0.0);
        assert_eq!(wheels[2].digit, 2);
        assert_eq!(wheels[2].fraction, 0.25);
    }
}
