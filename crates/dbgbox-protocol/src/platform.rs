//! Language platforms that can be debugged inside a container.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform tag selecting a debug helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DockerPlatform {
    /// .NET Core (coreclr debugger)
    #[serde(rename = "netCore")]
    NetCore,
    /// Node.js inspector
    #[serde(rename = "node")]
    Node,
    /// Python (debugpy)
    #[serde(rename = "python")]
    Python,
}

impl DockerPlatform {
    pub const ALL: [DockerPlatform; 3] = [Self::NetCore, Self::Node, Self::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            DockerPlatform::NetCore => "netCore",
            DockerPlatform::Node => "node",
            DockerPlatform::Python => "python",
        }
    }

    /// Debug type the host debugger expects for this platform.
    pub fn debug_type(&self) -> &'static str {
        match self {
            DockerPlatform::NetCore => "coreclr",
            DockerPlatform::Node => "node",
            DockerPlatform::Python => "python",
        }
    }

    /// Map a launch configuration `type` to a platform.
    pub fn from_debug_type(debug_type: &str) -> Option<Self> {
        match debug_type {
            "coreclr" | "netCore" | "docker-coreclr" => Some(Self::NetCore),
            "node" | "pwa-node" | "docker-node" => Some(Self::Node),
            "python" | "debugpy" | "docker-python" => Some(Self::Python),
            _ => None,
        }
    }
}

impl fmt::Display for DockerPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a known platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlatformError(pub String);

impl fmt::Display for ParsePlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown platform '{}'", self.0)
    }
}

impl std::error::Error for ParsePlatformError {}

impl FromStr for DockerPlatform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "netCore" | "netcore" | "dotnet" => Ok(Self::NetCore),
            "node" => Ok(Self::Node),
            "python" => Ok(Self::Python),
            other => Err(ParsePlatformError(other.to_string())),
        }
    }
}
