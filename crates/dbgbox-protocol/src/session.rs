//! Resolved debug sessions handed to the host debugger.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::{RequestKind, deserialize_request_kind};

/// Container options attached to a debug configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerOptions {
    /// Container removed when the debug session ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name_to_kill: Option<String>,

    /// Absent means removal is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_container_after_debug: Option<bool>,
}

impl DockerOptions {
    pub fn for_container(name: impl Into<String>) -> Self {
        Self {
            container_name_to_kill: Some(name.into()),
            remove_container_after_debug: None,
        }
    }

    /// Name of the container to remove after debugging, if removal applies.
    pub fn removal_target(&self) -> Option<&str> {
        if !self.remove_container_after_debug.unwrap_or(true) {
            return None;
        }
        self.container_name_to_kill
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

/// A debug configuration after platform resolution.
///
/// `debug_type` and `request` are optional here only so that a helper's
/// incomplete output can be represented and rejected by validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSession {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub debug_type: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_request_kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub request: Option<RequestKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_options: Option<DockerOptions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResolvedSession {
    pub fn new(debug_type: impl Into<String>, request: RequestKind) -> Self {
        Self {
            debug_type: Some(debug_type.into()),
            request: Some(request),
            ..Default::default()
        }
    }

    pub fn with_docker_options(mut self, options: DockerOptions) -> Self {
        self.docker_options = Some(options);
        self
    }

    pub fn container_name_to_kill(&self) -> Option<&str> {
        self.docker_options
            .as_ref()
            .and_then(|o| o.container_name_to_kill.as_deref())
    }

    /// Container to remove after the session, honoring `removeContainerAfterDebug`.
    pub fn removal_target(&self) -> Option<&str> {
        self.docker_options.as_ref().and_then(|o| o.removal_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removal_defaults_to_enabled() {
        let options = DockerOptions::for_container("c1");
        assert_eq!(options.removal_target(), Some("c1"));
    }

    #[test]
    fn test_removal_disabled_explicitly() {
        let options = DockerOptions {
            container_name_to_kill: Some("c1".to_string()),
            remove_container_after_debug: Some(false),
        };
        assert_eq!(options.removal_target(), None);
    }

    #[test]
    fn test_empty_container_name_is_not_a_target() {
        let options = DockerOptions::for_container("");
        assert_eq!(options.removal_target(), None);
    }

    #[test]
    fn test_serializes_with_host_field_names() {
        let session = ResolvedSession::new("node", RequestKind::Attach)
            .with_docker_options(DockerOptions::for_container("app-dev"));
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "node",
                "request": "attach",
                "dockerOptions": { "containerNameToKill": "app-dev" }
            })
        );
    }
}
