//! Session termination events.

use serde::{Deserialize, Serialize};

use crate::session::ResolvedSession;

/// Emitted once per ended debug session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationEvent {
    /// Host-assigned session identifier.
    pub session_id: String,

    /// Unix ms timestamp.
    pub ts: i64,

    /// Configuration the session was started with. Sessions started by other
    /// debuggers may not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ResolvedSession>,
}

impl TerminationEvent {
    pub fn new(session_id: impl Into<String>, configuration: Option<ResolvedSession>) -> Self {
        Self {
            session_id: session_id.into(),
            ts: chrono::Utc::now().timestamp_millis(),
            configuration,
        }
    }

    pub fn container_name_to_kill(&self) -> Option<&str> {
        self.configuration
            .as_ref()
            .and_then(|c| c.container_name_to_kill())
    }
}
