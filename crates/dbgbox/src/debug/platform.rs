//! Platform registry: maps a platform tag to the helper that resolves it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use dbgbox_protocol::{DebugRequest, DockerPlatform, ResolvedSession};

use super::DebugContext;
use super::error::{DebugError, DebugResult};

/// Resolves a debug request for one language platform.
#[async_trait]
pub trait DebugHelper: Send + Sync {
    /// Turn `request` into a session the host debugger can start.
    ///
    /// `Ok(None)` aborts the debug start without an error.
    async fn resolve_debug_configuration(
        &self,
        context: &DebugContext,
        request: &DebugRequest,
    ) -> anyhow::Result<Option<ResolvedSession>>;
}

/// Derive the platform tag of a request.
///
/// A declared `platform` is used when it names a known platform. Otherwise
/// the tag is inferred from the debugger type, then from a language block
/// (`netCore`, `node`, `python`) in the raw fields. When nothing matches the
/// debugger type itself is returned, which the registry then rejects.
pub fn get_platform(request: &DebugRequest) -> String {
    if let Some(platform) = request
        .platform
        .as_deref()
        .and_then(|p| p.parse::<DockerPlatform>().ok())
    {
        return platform.as_str().to_string();
    }

    if let Some(platform) = request
        .debug_type
        .as_deref()
        .and_then(DockerPlatform::from_debug_type)
    {
        return platform.as_str().to_string();
    }

    if let Some(platform) = DockerPlatform::ALL
        .into_iter()
        .find(|p| request.extra.contains_key(p.as_str()))
    {
        return platform.as_str().to_string();
    }

    request
        .platform
        .clone()
        .or_else(|| request.debug_type.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read-only lookup from platform to helper.
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    helpers: HashMap<DockerPlatform, Arc<dyn DebugHelper>>,
}

impl fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, platform: DockerPlatform, helper: Arc<dyn DebugHelper>) -> Self {
        self.helpers.insert(platform, helper);
        self
    }

    /// Registered platforms, in declaration order.
    pub fn platforms(&self) -> Vec<DockerPlatform> {
        DockerPlatform::ALL
            .into_iter()
            .filter(|p| self.helpers.contains_key(p))
            .collect()
    }

    /// Look up the helper for `tag`.
    pub fn resolve(&self, tag: &str) -> DebugResult<(DockerPlatform, Arc<dyn DebugHelper>)> {
        let unsupported = || DebugError::UnsupportedPlatform(tag.to_string());
        let platform = tag.parse::<DockerPlatform>().map_err(|_| unsupported())?;
        let helper = self.helpers.get(&platform).ok_or_else(unsupported)?;
        Ok((platform, Arc::clone(helper)))
    }
}
