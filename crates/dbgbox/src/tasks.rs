//! Lookup of the container run task associated with a debug request.
//!
//! A request names its pre-launch task by label. The associated run
//! definition is that task if it is a `docker-run` task, otherwise the first
//! `docker-run` task reachable through `dependsOn`, searched depth-first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use dbgbox_protocol::{DebugRequest, RunDefinition, TaskDefinition};

/// Finds the run definition a debug request depends on.
#[async_trait]
pub trait RunTaskLookup: Send + Sync {
    async fn find_associated_run_task(&self, request: &DebugRequest)
    -> Result<Option<RunDefinition>>;
}

/// Search `tasks` for the docker-run task reachable from `label`.
pub fn find_docker_run_task(tasks: &[TaskDefinition], label: &str) -> Option<RunDefinition> {
    let mut visited = HashSet::new();
    find_recursive(tasks, label, &mut visited)
}

fn find_recursive<'a>(
    tasks: &'a [TaskDefinition],
    label: &'a str,
    visited: &mut HashSet<&'a str>,
) -> Option<RunDefinition> {
    if !visited.insert(label) {
        return None;
    }

    let task = tasks.iter().find(|t| t.label == label)?;
    if task.is_docker_run() {
        return Some(RunDefinition::from(task));
    }

    task.depends_on
        .iter()
        .find_map(|dependency| find_recursive(tasks, dependency, visited))
}

/// Reads task definitions from a JSON file on every lookup.
///
/// The file holds either a bare array of tasks or `{ "tasks": [...] }`.
/// A missing file means there are no tasks.
#[derive(Debug, Clone)]
pub struct TaskFileLookup {
    path: PathBuf,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TasksFile {
    Wrapped { tasks: Vec<TaskDefinition> },
    Bare(Vec<TaskDefinition>),
}

impl TaskFileLookup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<TaskDefinition>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no tasks file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        let parsed: TasksFile = serde_json::from_str(&contents)
            .with_context(|| format!("parsing tasks file {}", self.path.display()))?;

        Ok(match parsed {
            TasksFile::Wrapped { tasks } => tasks,
            TasksFile::Bare(tasks) => tasks,
        })
    }
}

#[async_trait]
impl RunTaskLookup for TaskFileLookup {
    async fn find_associated_run_task(
        &self,
        request: &DebugRequest,
    ) -> Result<Option<RunDefinition>> {
        let Some(label) = request.pre_launch_task.as_deref() else {
            return Ok(None);
        };

        let tasks = self.load().await?;
        let found = find_docker_run_task(&tasks, label);
        debug!(
            "pre-launch task '{}' -> run task {:?}",
            label,
            found.as_ref().map(|r| r.label.as_str())
        );
        Ok(found)
    }
}
