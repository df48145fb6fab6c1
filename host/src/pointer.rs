//! Mouse and light pen state shared with the simulation thread.
//!
//! Pointer movement is too frequent for the command queue, so the control
//! thread writes it here and the engine reads a snapshot every frame.

use std::{
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU16, AtomicU64, Ordering},
    },
    time::Instant,
};

use machine::engine::{LightPen, PointerSnapshot};

#[derive(Debug)]
pub struct PointerState {
    epoch: Instant,
    mouse_x: AtomicU16,
    mouse_y: AtomicU16,
    mouse_timestamp: AtomicU64,
    light_pen: Mutex<LightPen>,
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            mouse_x: AtomicU16::new(0),
            mouse_y: AtomicU16::new(0),
            mouse_timestamp: AtomicU64::new(0),
            light_pen: Mutex::new(LightPen::default()),
        }
    }

    /// Relative movement. The engine's y axis points up, so `dy` is
    /// subtracted. Both coordinates wrap at 16 bits.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn moved(&self, dx: i32, dy: i32) {
        // the low 16 bits of the two's complement sum are the wrapped value
        let x = i32::from(self.mouse_x.load(Ordering::Relaxed)).wrapping_add(dx);
        let y = i32::from(self.mouse_y.load(Ordering::Relaxed)).wrapping_sub(dy);
        self.mouse_x.store((x & 0xffff) as u16, Ordering::Relaxed);
        self.mouse_y.store((y & 0xffff) as u16, Ordering::Relaxed);
        self.mouse_timestamp
            .store(self.elapsed_micros(), Ordering::Relaxed);
    }

    pub fn set_x(&self, x: u16) {
        self.mouse_x.store(x, Ordering::Relaxed);
    }

    pub fn set_y(&self, y: u16) {
        self.mouse_y.store(y, Ordering::Relaxed);
    }

    pub fn set_light_pen(&self, pen: LightPen) {
        *self.lock_pen() = pen;
    }

    #[must_use]
    pub fn snapshot(&self) -> PointerSnapshot {
        PointerSnapshot {
            mouse_x: self.mouse_x.load(Ordering::Relaxed),
            mouse_y: self.mouse_y.load(Ordering::Relaxed),
            mouse_timestamp: self.mouse_timestamp.load(Ordering::Relaxed),
            light_pen: *self.lock_pen(),
        }
    }

    fn elapsed_micros(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    fn lock_pen(&self) -> MutexGuard<'_, LightPen> {
        self.light_pen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
