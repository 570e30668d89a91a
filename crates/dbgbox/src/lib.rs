//! dbgbox library
//!
//! Resolves container debug requests into debug sessions and removes each
//! session's container once the session ends.

pub mod container;
pub mod debug;
pub mod prompt;
pub mod scaffold;
pub mod tasks;
pub mod telemetry;
pub mod workspace;

pub use dbgbox_protocol as protocol;
