//! Debug request resolution and container lifecycle supervision.
//!
//! A request flows through [`DockerDebugConfigurationProvider`]: the
//! associated run task is looked up, the [`PlatformRegistry`] supplies a
//! [`DebugHelper`], the helper's result is validated and finally handed to the
//! [`LifecycleSupervisor`], which removes the session's container once the
//! session ends.

mod error;
pub mod events;
pub mod helpers;
pub mod platform;
mod provider;
pub mod supervisor;

pub use error::{DebugError, DebugResult};
pub use events::TerminationEvents;
pub use helpers::ContainerDebugHelper;
pub use platform::{DebugHelper, PlatformRegistry, get_platform};
pub use provider::{
    ADD_DOCKER_FILES, CONFIGURE_COMMAND, DISCOVERY_MESSAGE, DockerDebugConfigurationProvider,
    validate_resolved_session,
};
pub use supervisor::{LifecycleSupervisor, Supervision, SupervisorState};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use dbgbox_protocol::{DockerPlatform, RunDefinition};

use crate::workspace::WorkspaceFolder;

/// Everything a platform helper gets besides the request itself.
#[derive(Debug, Clone)]
pub struct DebugContext {
    pub folder: WorkspaceFolder,
    pub platform: DockerPlatform,
    pub run_definition: Option<RunDefinition>,
    pub cancellation: CancellationToken,
}

/// Registry with the built-in helper for every platform.
pub fn default_registry() -> PlatformRegistry {
    let helper: Arc<dyn DebugHelper> = Arc::new(ContainerDebugHelper::new());
    DockerPlatform::ALL
        .into_iter()
        .fold(PlatformRegistry::new(), |registry, platform| {
            registry.register(platform, Arc::clone(&helper))
        })
}
