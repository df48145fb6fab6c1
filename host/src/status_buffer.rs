//! Device status double buffer.
//!
//! The engine writes the "current" side from the simulation thread as
//! often as it likes, without locking. The control thread's polling tick
//! compares it against its own "last" side and reports only what changed.
//! Fields are individually atomic; a reading that mixes two updates is
//! corrected on the next tick.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use machine::{
    engine::StatusSink,
    media::{DRIVE_COUNT, drive_unit},
    status::{DriveStatus, TapeControl, TapeStatus},
};

/// Receives status changes on the control thread.
pub trait StatusObserver {
    /// `unit` is the logical drive number, 8..=11.
    fn update_drive_status(&self, unit: u8, status: &DriveStatus);
    fn update_tape_status(&self, status: &TapeStatus);
}

#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    const fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct DriveCell {
    track: AtomicF64,
    led1: AtomicF64,
    led2: AtomicF64,
}

impl DriveCell {
    const fn new() -> Self {
        Self {
            track: AtomicF64::new(1.0),
            led1: AtomicF64::new(0.0),
            led2: AtomicF64::new(0.0),
        }
    }
}

/// The "current" side, shared between both threads.
#[derive(Debug)]
pub struct StatusRecorder {
    drives: [DriveCell; DRIVE_COUNT],
    tape_counter: AtomicF64,
    tape_control: AtomicU8,
    tape_motor: AtomicBool,
}

impl Default for StatusRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRecorder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            drives: [const { DriveCell::new() }; DRIVE_COUNT],
            tape_counter: AtomicF64::new(0.0),
            tape_control: AtomicU8::new(0),
            tape_motor: AtomicBool::new(false),
        }
    }

    /// Stores the full state of drive slot `drive` (0..=3), others are ignored.
    pub fn record_drive(&self, drive: usize, track: f64, led1: f64, led2: f64) {
        if let Some(cell) = self.drives.get(drive) {
            cell.track.store(track);
            cell.led1.store(led1);
            cell.led2.store(led2);
        }
    }

    pub fn record_tape(&self, counter: f64, control: TapeControl, motor_on: bool) {
        self.tape_counter.store(counter);
        self.tape_control.store(control.raw(), Ordering::Relaxed);
        self.tape_motor.store(motor_on, Ordering::Relaxed);
    }

    #[must_use]
    pub fn drive(&self, drive: usize) -> Option<DriveStatus> {
        self.drives.get(drive).map(|cell| DriveStatus {
            track: cell.track.load(),
            led1_intensity: cell.led1.load(),
            led2_intensity: cell.led2.load(),
        })
    }

    #[must_use]
    pub fn tape(&self) -> TapeStatus {
        TapeStatus {
            counter: self.tape_counter.load(),
            control: TapeControl::from_raw(self.tape_control.load(Ordering::Relaxed)),
            motor_on: self.tape_motor.load(Ordering::Relaxed),
        }
    }

    /// Back to power-on values.
    pub fn reset(&self) {
        let idle = DriveStatus::default();
        for drive in 0..DRIVE_COUNT {
            self.record_drive(
                drive,
                idle.track,
                idle.led1_intensity,
                idle.led2_intensity,
            );
        }
        self.record_tape(0.0, TapeControl::Stop, false);
    }
}

impl StatusSink for StatusRecorder {
    fn drive_track(&self, drive: usize, track: f64) {
        if let Some(cell) = self.drives.get(drive) {
            cell.track.store(track);
        }
    }

    fn drive_leds(&self, drive: usize, led1: f64, led2: f64) {
        if let Some(cell) = self.drives.get(drive) {
            cell.led1.store(led1);
            cell.led2.store(led2);
        }
    }

    fn tape_counter(&self, counter: f64) {
        self.tape_counter.store(counter);
    }

    fn tape_control(&self, control: TapeControl) {
        self.tape_control.store(control.raw(), Ordering::Relaxed);
    }

    fn tape_motor(&self, on: bool) {
        self.tape_motor.store(on, Ordering::Relaxed);
    }
}

/// The "last" side, owned by the control thread.
#[derive(Debug, Default)]
pub struct StatusBuffer {
    last_drives: [DriveStatus; DRIVE_COUNT],
    last_tape: TapeStatus,
}

impl StatusBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every drive and the tape whose state differs from the last
    /// report. Returns the number of callbacks made.
    pub fn publish_changes(
        &mut self,
        current: &StatusRecorder,
        observer: &dyn StatusObserver,
    ) -> usize {
        let mut published = 0;

        for (index, last) in self.last_drives.iter_mut().enumerate() {
            let Some(drive) = current.drive(index) else {
                continue;
            };
            if drive != *last
                && let Some(unit) = drive_unit(index)
            {
                *last = drive;
                observer.update_drive_status(unit, last);
                published += 1;
            }
        }

        let tape = current.tape();
        if tape != self.last_tape {
            self.last_tape = tape;
            observer.update_tape_status(&self.last_tape);
            published += 1;
        }

        published
    }

    #[must_use]
    pub const fn last_drive(&self, drive: usize) -> Option<&DriveStatus> {
        if drive < DRIVE_COUNT {
            Some(&self.last_drives[drive])
        } else {
            None
        }
    }

    #[must_use]
    pub const fn last_tape(&self) -> &TapeStatus {
        &self.last_tape
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, sync::Arc, thread};

    #[derive(Default)]
    struct Collector {
        drives: RefCell<Vec<(u8, DriveStatus)>>,
        tapes: RefCell<Vec<TapeStatus>>,
    }

    impl StatusObserver for Collector {
        fn update_drive_status(&self, unit: u8, status: &DriveStatus) {
            self.drives.borrow_mut().push((unit, *status));
        }

        fn update_tape_status(&self, status: &TapeStatus) {
            self.tapes.borrow_mut().push(*status);
        }
    }

    #[test]
    fn nothing_changed_nothing_published() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        assert_eq!(buffer.publish_changes(&recorder, &observer), 0);
        assert!(observer.drives.borrow().is_empty());
        assert!(observer.tapes.borrow().is_empty());
    }

    #[test]
    fn identical_writes_publish_once() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        recorder.record_drive(0, 5.0, 1.0, 0.0);
        recorder.record_drive(0, 5.0, 1.0, 0.0);
        assert_eq!(buffer.publish_changes(&recorder, &observer), 1);
        assert_eq!(buffer.publish_changes(&recorder, &observer), 0);

        assert_eq!(
            *observer.drives.borrow(),
            vec![(
                8,
                DriveStatus {
                    track: 5.0,
                    led1_intensity: 1.0,
                    led2_intensity: 0.0
                }
            )]
        );
    }

    #[test]
    fn each_change_publishes_once_per_tick() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        recorder.record_drive(0, 5.0, 0.0, 0.0);
        buffer.publish_changes(&recorder, &observer);
        recorder.record_drive(0, 6.0, 0.0, 0.0);
        recorder.record_drive(0, 7.0, 0.0, 0.0);
        buffer.publish_changes(&recorder, &observer);

        let tracks: Vec<f64> = observer
            .drives
            .borrow()
            .iter()
            .map(|(_, status)| status.track)
            .collect();
        assert_eq!(tracks, vec![5.0, 7.0]);
    }

    #[test]
    fn each_unit_reports_its_own_leds() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        recorder.record_drive(1, 18.0, 0.0, 0.5);
        recorder.record_drive(2, 1.0, 0.0, 0.9);
        assert_eq!(buffer.publish_changes(&recorder, &observer), 2);

        let drives = observer.drives.borrow();
        assert_eq!(drives[0].0, 9);
        assert_eq!(drives[0].1.led2_intensity, 0.5);
        assert_eq!(drives[1].0, 10);
        assert_eq!(drives[1].1.led2_intensity, 0.9);
    }

    #[test]
    fn partial_updates_through_the_sink() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        recorder.drive_track(3, 40.5);
        recorder.tape_control(TapeControl::Start);
        recorder.tape_motor(true);
        recorder.tape_counter(12.0);
        assert_eq!(buffer.publish_changes(&recorder, &observer), 2);

        assert_eq!(observer.drives.borrow()[0].0, 11);
        assert_eq!(
            observer.tapes.borrow()[0],
            TapeStatus {
                counter: 12.0,
                control: TapeControl::Start,
                motor_on: true
            }
        );
        assert_eq!(buffer.last_tape().control, TapeControl::Start);
    }

    #[test]
    fn out_of_range_drives_are_ignored() {
        let recorder = StatusRecorder::new();
        recorder.record_drive(4, 9.0, 1.0, 1.0);
        recorder.drive_leds(7, 1.0, 1.0);
        assert_eq!(recorder.drive(4), None);
        assert_eq!(recorder.drive(0), Some(DriveStatus::default()));
    }

    #[test]
    fn writes_from_another_thread_are_seen() {
        let recorder = Arc::new(StatusRecorder::new());
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        let writer = Arc::clone(&recorder);
        thread::spawn(move || {
            for line in 0..312 {
                writer.record_tape(f64::from(line), TapeControl::Forward, true);
            }
        })
        .join()
        .unwrap();

        assert_eq!(buffer.publish_changes(&recorder, &observer), 1);
        assert_eq!(observer.tapes.borrow()[0].counter, 311.0);
    }

    #[test]
    fn reset_returns_to_power_on_values() {
        let recorder = StatusRecorder::new();
        let mut buffer = StatusBuffer::new();
        let observer = Collector::default();

        recorder.record_drive(0, 20.0, 1.0, 0.0);
        recorder.record_tape(3.0, TapeControl::Record, true);
        buffer.publish_changes(&recorder, &observer);

        recorder.reset();
        buffer.reset();
        assert_eq!(buffer.publish_changes(&recorder, &observer), 0);
        assert_eq!(buffer.last_drive(0), Some(&DriveStatus::default()));
    }
}
