//! Workspace folders the debugger can run against.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A folder opened in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

impl WorkspaceFolder {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Name the folder after the last path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());
        Self { name, path }
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }
}

/// Source of the currently open workspace folders, in order.
pub trait WorkspaceProvider: Send + Sync {
    fn current_folders(&self) -> Vec<WorkspaceFolder>;
}

/// Fixed set of folders, typically taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    folders: Vec<WorkspaceFolder>,
}

impl StaticWorkspace {
    pub fn new(folders: Vec<WorkspaceFolder>) -> Self {
        Self { folders }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl WorkspaceProvider for StaticWorkspace {
    fn current_folders(&self) -> Vec<WorkspaceFolder> {
        self.folders.clone()
    }
}
