//! Task definitions as read from a tasks file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::DOCKER_RUN_TASK_TYPE;

/// Options of a `docker-run` task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerRunOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Port mappings in `host:container` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Any task entry. Only `docker-run` tasks become run definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub label: String,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_run: Option<DockerRunOptions>,
}

impl TaskDefinition {
    pub fn is_docker_run(&self) -> bool {
        self.task_type == DOCKER_RUN_TASK_TYPE
    }
}

/// A container run task associated with a debug request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDefinition {
    pub label: String,
    #[serde(default)]
    pub docker_run: DockerRunOptions,
}

impl RunDefinition {
    pub fn container_name(&self) -> Option<&str> {
        self.docker_run.container_name.as_deref()
    }
}

impl From<&TaskDefinition> for RunDefinition {
    fn from(task: &TaskDefinition) -> Self {
        Self {
            label: task.label.clone(),
            docker_run: task.docker_run.clone().unwrap_or_default(),
        }
    }
}
