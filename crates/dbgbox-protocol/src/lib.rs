//! Wire types shared by every dbgbox component.
//!
//! The shapes here mirror the launch configuration format of the host editor:
//!
//! ```text
//! launch.json entry --[DebugRequest]--> resolver --[ResolvedSession]--> host debugger
//!                                                        |
//!                                   session ends --[TerminationEvent]--> supervisors
//! ```
//!
//! Field names are camelCase on the wire. Unknown fields are preserved in
//! `extra` maps so language-specific settings survive a resolve round trip.

pub mod events;
pub mod platform;
pub mod request;
pub mod session;
pub mod tasks;

pub use events::TerminationEvent;
pub use platform::{DockerPlatform, ParsePlatformError};
pub use request::{DebugRequest, RequestKind};
pub use session::{DockerOptions, ResolvedSession};
pub use tasks::{DockerRunOptions, RunDefinition, TaskDefinition};

/// Task type that marks a container run task.
pub const DOCKER_RUN_TASK_TYPE: &str = "docker-run";

/// The only orchestration mode currently supported.
pub const ORCHESTRATION_SINGLE: &str = "single";
