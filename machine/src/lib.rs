pub mod command;
pub mod engine;
pub mod joystick;
pub mod key;
pub mod media;
pub mod resource;
pub mod status;
