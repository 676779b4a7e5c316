//! Side-effecting collaborators of the install pipeline.

pub mod download;
pub mod extract;
pub mod install;
pub mod postflight;
pub mod verify;
