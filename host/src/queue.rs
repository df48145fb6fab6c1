//! The mailbox between the control thread and the simulation thread.
//!
//! The control thread appends under the lock. Once per frame the
//! simulation thread swaps the whole pending sequence out under the lock
//! and applies it with the lock released, so a slow engine call never
//! stalls an enqueue.

use std::{
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};

use machine::command::Command;

/// What applying a single command asks the queue to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Applied,
    /// Not due yet, run this command again on the next drain.
    Defer(Command),
    /// Stop draining and drop everything still pending.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<Vec<Command>>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, command: Command) {
        self.lock().push(command);
    }

    /// Appends `commands` as one unit, no drain can split them.
    pub fn enqueue_all(&self, commands: impl IntoIterator<Item = Command>) {
        self.lock().extend(commands);
    }

    /// Applies every command pending at the time of the call, in order.
    ///
    /// Deferred commands go back in front of whatever was enqueued while
    /// `apply` ran, keeping their relative order. After a `Stop` the rest
    /// of this generation and all deferred commands are discarded.
    pub fn drain_and_apply(&self, mut apply: impl FnMut(Command) -> Disposition) -> Drain {
        let taken = mem::take(&mut *self.lock());
        if taken.is_empty() {
            return Drain::Continue;
        }

        let mut deferred = Vec::new();
        for command in taken {
            match apply(command) {
                Disposition::Applied => {}
                Disposition::Defer(later) => deferred.push(later),
                Disposition::Stop => return Drain::Stop,
            }
        }

        if !deferred.is_empty() {
            self.lock().splice(0..0, deferred);
        }
        Drain::Continue
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops all pending commands.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while the lock was held cannot leave the vector half updated.
    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
