//! Container runtime client.
//!
//! Provides an async interface to the Docker or Podman CLI. Only the commands
//! the debug lifecycle needs are exposed: start, state inspection and forced
//! removal.

mod error;
pub mod watch;

pub use error::{ContainerError, ContainerResult};
pub use watch::{WatchOutcome, is_active_state, wait_for_container, watch_until_stopped};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    /// Docker runtime (default)
    #[default]
    Docker,
    /// Podman runtime
    Podman,
}

impl RuntimeType {
    /// Get the default binary name for this runtime.
    pub fn default_binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.default_binary())
    }
}

/// Validate a container ID or name.
///
/// Container IDs are hex strings, names are alphanumeric with `-`, `_` and `.`
/// after the first character.
pub(crate) fn validate_container_id_or_name(id: &str) -> ContainerResult<()> {
    if id.is_empty() {
        return Err(ContainerError::InvalidInput(
            "container ID or name cannot be empty".to_string(),
        ));
    }

    if id.len() > 128 {
        return Err(ContainerError::InvalidInput(
            "container ID or name exceeds maximum length".to_string(),
        ));
    }

    let mut chars = id.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !first_ok || !rest_ok {
        return Err(ContainerError::InvalidInput(format!(
            "container ID or name '{}' contains invalid characters",
            id
        )));
    }

    Ok(())
}

/// Container runtime abstraction for testability.
#[async_trait]
pub trait ContainerRuntimeApi: Send + Sync {
    /// Start a stopped container.
    async fn start_container(&self, container: &str) -> ContainerResult<()>;

    /// Remove a container. With `force` a running container is killed first.
    async fn remove_container(&self, container: &str, force: bool) -> ContainerResult<()>;

    /// State string of a container (`running`, `exited`, ...), `None` if missing.
    async fn container_state_status(&self, container: &str) -> ContainerResult<Option<String>>;
}

/// Container runtime client backed by the docker/podman CLI.
#[derive(Debug, Clone)]
pub struct ContainerRuntime {
    runtime_type: RuntimeType,
    binary: String,
}

#[async_trait]
impl ContainerRuntimeApi for ContainerRuntime {
    async fn start_container(&self, container: &str) -> ContainerResult<()> {
        self.start_container(container).await
    }

    async fn remove_container(&self, container: &str, force: bool) -> ContainerResult<()> {
        self.remove_container(container, force).await
    }

    async fn container_state_status(&self, container: &str) -> ContainerResult<Option<String>> {
        self.container_state_status(container).await
    }
}

impl Default for ContainerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime {
    /// Create a new container runtime with auto-detection.
    ///
    /// Prefers Docker, falls back to Podman.
    pub fn new() -> Self {
        if Self::is_binary_available("docker") {
            Self::with_type(RuntimeType::Docker)
        } else if Self::is_binary_available("podman") {
            Self::with_type(RuntimeType::Podman)
        } else {
            // Will fail at call time with RuntimeUnavailable
            Self::with_type(RuntimeType::Docker)
        }
    }

    /// Create a container runtime with a specific type.
    pub fn with_type(runtime_type: RuntimeType) -> Self {
        Self {
            binary: runtime_type.default_binary().to_string(),
            runtime_type,
        }
    }

    /// Create a container runtime with a custom binary path.
    pub fn with_binary(runtime_type: RuntimeType, binary: impl Into<String>) -> Self {
        Self {
            runtime_type,
            binary: binary.into(),
        }
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn is_binary_available(name: &str) -> bool {
        std::process::Command::new("which")
            .arg(name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Spawn the runtime binary and collect its output.
    async fn output(&self, args: &[&str]) -> ContainerResult<Output> {
        Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ContainerError::RuntimeUnavailable {
                binary: self.binary.clone(),
                message: e.to_string(),
            })
    }

    /// Run a command that must exit successfully.
    async fn run(&self, command: &str, args: &[&str]) -> ContainerResult<String> {
        let output = self.output(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ContainerError::CommandFailed {
                command: command.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Check if the container runtime is available and working.
    pub async fn health_check(&self) -> ContainerResult<String> {
        self.run("version", &["version", "--format", "json"]).await
    }

    /// Start a stopped container.
    pub async fn start_container(&self, container: &str) -> ContainerResult<()> {
        validate_container_id_or_name(container)?;
        self.run("start", &["start", container]).await.map(|_| ())
    }

    /// Remove a container.
    pub async fn remove_container(&self, container: &str, force: bool) -> ContainerResult<()> {
        validate_container_id_or_name(container)?;

        let mut args = vec!["rm"];
        if force {
            args.push("-f");
        }
        args.push(container);

        match self.run("rm", &args).await {
            Ok(_) => Ok(()),
            Err(ContainerError::CommandFailed { ref message, .. }) if is_missing_container(message) => {
                Err(ContainerError::ContainerNotFound(container.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Get the container state status string via `inspect`.
    ///
    /// Returns `Ok(None)` when the container does not exist.
    pub async fn container_state_status(
        &self,
        container: &str,
    ) -> ContainerResult<Option<String>> {
        validate_container_id_or_name(container)?;

        let output = self
            .output(&["inspect", "--format", "{{.State.Status}}", container])
            .await?;

        if !output.status.success() {
            // Missing container is not an error; callers treat it as gone.
            return Ok(None);
        }

        let status = String::from_utf8_lossy(&output.stdout)
            .trim()
            .trim_matches('"')
            .to_string();
        if status.is_empty() {
            return Ok(None);
        }

        Ok(Some(status))
    }
}

/// Whether runtime stderr says the container does not exist.
fn is_missing_container(message: &str) -> bool {
    let message = message.to_lowercase();
    // docker: "No such container", podman: "no container with name or ID"
    message.contains("no such container") || message.contains("no container with name or id")
}
