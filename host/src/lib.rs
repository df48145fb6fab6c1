pub mod keyboard;
pub mod launch;
pub mod pointer;
pub mod queue;
pub mod session;
pub mod sim_thread;
pub mod staging;
pub mod status_buffer;

#[cfg(test)]
mod test_engine;

pub use session::{Session, SessionError, SessionState};
pub use status_buffer::StatusObserver;
