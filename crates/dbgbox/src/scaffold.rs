//! Guided setup: writes starter debug and task files into a workspace folder.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::info;
use serde_json::{Value, json};

use dbgbox_protocol::DockerPlatform;

use crate::debug::CONFIGURE_COMMAND;
use crate::debug::helpers::default_container_name;
use crate::prompt::CommandExecutor;
use crate::workspace::WorkspaceFolder;

/// Directory inside a workspace folder holding dbgbox files.
pub const CONFIG_DIR: &str = ".dbgbox";
pub const TASKS_FILE: &str = "tasks.json";
pub const LAUNCH_FILE: &str = "launch.json";

/// Default location of the tasks file for a folder.
pub fn tasks_path(folder: &WorkspaceFolder) -> PathBuf {
    folder.join(CONFIG_DIR).join(TASKS_FILE)
}

fn debug_port(platform: DockerPlatform) -> u16 {
    match platform {
        DockerPlatform::NetCore => 5000,
        DockerPlatform::Node => 9229,
        DockerPlatform::Python => 5678,
    }
}

/// Starter `tasks.json` with a build and a run task.
pub fn tasks_template(folder: &WorkspaceFolder, platform: DockerPlatform) -> Value {
    let container = default_container_name(&folder.name);
    let port = debug_port(platform);
    json!({
        "tasks": [
            {
                "label": "docker-build",
                "type": "docker-build"
            },
            {
                "label": "docker-run: debug",
                "type": "docker-run",
                "dependsOn": ["docker-build"],
                "dockerRun": {
                    "containerName": container,
                    "image": format!("{}:dev", folder.name.to_lowercase()),
                    "ports": [format!("{port}:{port}")]
                }
            }
        ]
    })
}

/// Starter `launch.json` with one launch configuration.
pub fn launch_template(platform: DockerPlatform) -> Value {
    json!({
        "configurations": [
            {
                "name": format!("Docker {} Launch", platform),
                "type": platform.debug_type(),
                "request": "launch",
                "platform": platform.as_str(),
                "preLaunchTask": "docker-run: debug"
            }
        ]
    })
}

async fn write_json(path: &Path, value: &Value, force: bool) -> Result<bool> {
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        info!("keeping existing {}", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let mut body = serde_json::to_string_pretty(value).context("serializing template")?;
    body.push('\n');
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(true)
}

/// Writes the starter files when the configure command runs.
#[derive(Debug, Clone)]
pub struct ScaffoldCommands {
    folder: WorkspaceFolder,
    platform: DockerPlatform,
    force: bool,
}

impl ScaffoldCommands {
    pub fn new(folder: WorkspaceFolder, platform: DockerPlatform) -> Self {
        Self {
            folder,
            platform,
            force: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Write both files. Returns the paths that were written.
    pub async fn scaffold(&self) -> Result<Vec<PathBuf>> {
        let dir = self.folder.join(CONFIG_DIR);
        let mut written = Vec::new();

        let tasks = dir.join(TASKS_FILE);
        if write_json(&tasks, &tasks_template(&self.folder, self.platform), self.force).await? {
            written.push(tasks);
        }

        let launch = dir.join(LAUNCH_FILE);
        if write_json(&launch, &launch_template(self.platform), self.force).await? {
            written.push(launch);
        }

        Ok(written)
    }
}

#[async_trait]
impl CommandExecutor for ScaffoldCommands {
    async fn execute_command(&self, command: &str) -> Result<()> {
        if command != CONFIGURE_COMMAND {
            bail!("unknown command '{command}'");
        }
        self.scaffold().await.map(|_| ())
    }
}
