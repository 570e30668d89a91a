//! Debug requests as declared by the user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::session::DockerOptions;

/// Whether the debugger launches a new process or attaches to a running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Launch,
    Attach,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Launch => "launch",
            RequestKind::Attach => "attach",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "launch" => Ok(Self::Launch),
            "attach" => Ok(Self::Attach),
            other => Err(format!("unknown debug request kind '{other}'")),
        }
    }
}

/// A launch configuration entry before resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugRequest {
    /// Debugger type. Absent when the user pressed F5 without any configuration.
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

    /// Declared platform tag. May be absent, in which case it is inferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Label of the task run before the debugger starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_options: Option<DockerOptions>,

    /// Language specific fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DebugRequest {
    pub fn launch(debug_type: impl Into<String>) -> Self {
        Self {
            debug_type: Some(debug_type.into()),
            request: Some(RequestKind::Launch),
            ..Default::default()
        }
    }

    pub fn attach(debug_type: impl Into<String>) -> Self {
        Self {
            debug_type: Some(debug_type.into()),
            request: Some(RequestKind::Attach),
            ..Default::default()
        }
    }

    pub fn is_attach(&self) -> bool {
        self.request == Some(RequestKind::Attach)
    }
}

/// Treat a missing, null or blank `request` as absent.
pub(crate) fn deserialize_request_kind<'de, D>(
    deserializer: D,
) -> Result<Option<RequestKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
