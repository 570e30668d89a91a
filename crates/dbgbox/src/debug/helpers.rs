//! Built-in platform helper for single-container debugging.
//!
//! The helper maps a request onto the debugger type of its platform and
//! decides which container the session owns: an explicit
//! `dockerOptions.containerNameToKill` wins, then the container of the
//! associated run task, then `<folder>-dev` for launch requests. Attach
//! requests only own a container when the user names one explicitly.

use async_trait::async_trait;
use log::debug;

use dbgbox_protocol::{DebugRequest, DockerOptions, RequestKind, ResolvedSession};

use super::DebugContext;
use super::platform::DebugHelper;

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerDebugHelper;

impl ContainerDebugHelper {
    pub fn new() -> Self {
        Self
    }
}

/// Default container name for a workspace folder.
pub fn default_container_name(folder_name: &str) -> String {
    let sanitized: String = folder_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let base = sanitized.trim_matches(['-', '_']);
    if base.is_empty() {
        "app-dev".to_string()
    } else {
        format!("{base}-dev")
    }
}

#[async_trait]
impl DebugHelper for ContainerDebugHelper {
    async fn resolve_debug_configuration(
        &self,
        context: &DebugContext,
        request: &DebugRequest,
    ) -> anyhow::Result<Option<ResolvedSession>> {
        if context.cancellation.is_cancelled() {
            debug!("resolution cancelled before {} helper ran", context.platform);
            return Ok(None);
        }

        let Some(kind) = request.request else {
            return Ok(None);
        };

        let mut options = request.docker_options.clone().unwrap_or_default();
        if options.container_name_to_kill.is_none() && kind == RequestKind::Launch {
            options.container_name_to_kill = Some(
                context
                    .run_definition
                    .as_ref()
                    .and_then(|run| run.container_name())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_container_name(&context.folder.name)),
            );
        }

        let docker_options = (options != DockerOptions::default()).then_some(options);

        Ok(Some(ResolvedSession {
            debug_type: Some(context.platform.debug_type().to_string()),
            request: Some(kind),
            name: request.name.clone(),
            docker_options,
            extra: request.extra.clone(),
        }))
    }
}
