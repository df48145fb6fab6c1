//! Press depth tracking for the keyboard matrix.
//!
//! The same key can be held by several sources at once (on-screen
//! keyboard, hardware keyboard, autotype). Only the first press and the
//! last release reach the machine.

use machine::{
    command::Command,
    key::{Key, MATRIX_SIZE},
};

#[derive(Debug, Default)]
pub struct KeyMatrixState {
    depth: [[u32; MATRIX_SIZE]; MATRIX_SIZE],
    /// Restore is wired straight to the NMI line, so it only latches.
    restore: bool,
}

impl KeyMatrixState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a press, returning the command to send if the key went down.
    pub fn press(&mut self, key: Key, delay: u32) -> Option<Command> {
        if key == Key::Restore {
            self.restore = true;
            return Some(Command::Restore { pressed: true });
        }
        let depth = self.depth_mut(key)?;
        *depth += 1;
        (*depth == 1).then_some(Command::Key {
            key,
            pressed: true,
            delay,
        })
    }

    /// Registers a release, returning the command to send if the key went up.
    ///
    /// Releasing a key that is not held is ignored.
    pub fn release(&mut self, key: Key, delay: u32) -> Option<Command> {
        if key == Key::Restore {
            self.restore = false;
            return Some(Command::Restore { pressed: false });
        }
        let depth = self.depth_mut(key)?;
        if *depth == 0 {
            return None;
        }
        *depth -= 1;
        (*depth == 0).then_some(Command::Key {
            key,
            pressed: false,
            delay,
        })
    }

    #[must_use]
    pub fn is_down(&self, key: Key) -> bool {
        if key == Key::Restore {
            return self.restore;
        }
        key.matrix()
            .is_some_and(|(row, column)| self.depth[usize::from(row)][usize::from(column)] > 0)
    }

    /// Forgets all held keys.
    pub fn clear(&mut self) {
        self.depth = [[0; MATRIX_SIZE]; MATRIX_SIZE];
        self.restore = false;
    }

    fn depth_mut(&mut self, key: Key) -> Option<&mut u32> {
        let (row, column) = key.matrix()?;
        Some(&mut self.depth[usize::from(row)][usize::from(column)])
    }
}
