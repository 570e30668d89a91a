//! Test utilities and common setup.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dbgbox::container::{ContainerError, ContainerResult, ContainerRuntimeApi};
use dbgbox::debug::{
    DebugContext, DebugHelper, DockerDebugConfigurationProvider, LifecycleSupervisor,
    PlatformRegistry, TerminationEvents, default_registry,
};
use dbgbox::prompt::{CommandExecutor, MessageItem, Prompter};
use dbgbox::protocol::{
    DebugRequest, DockerPlatform, DockerRunOptions, ResolvedSession, RunDefinition,
};
use dbgbox::tasks::RunTaskLookup;
use dbgbox::telemetry::{ActionContext, ErrorReporter};
use dbgbox::workspace::{StaticWorkspace, WorkspaceFolder};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Start(String),
    Remove { container: String, force: bool },
    Inspect(String),
}

/// Container runtime that tracks a set of existing containers in memory.
#[derive(Default)]
pub struct RecordingRuntime {
    containers: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RuntimeCall>>,
    unavailable: bool,
}

impl RecordingRuntime {
    pub fn with_containers(names: &[&str]) -> Self {
        Self {
            containers: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Every call fails as if the runtime binary were missing.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn removals_of(&self, container: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RuntimeCall::Remove { container: name, .. } if name == container))
            .count()
    }

    pub fn exists(&self, container: &str) -> bool {
        self.containers.lock().unwrap().contains(container)
    }

    fn check_available(&self) -> ContainerResult<()> {
        if self.unavailable {
            return Err(ContainerError::RuntimeUnavailable {
                binary: "docker".to_string(),
                message: "not found".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntimeApi for RecordingRuntime {
    async fn start_container(&self, container: &str) -> ContainerResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RuntimeCall::Start(container.to_string()));
        self.check_available()
    }

    async fn remove_container(&self, container: &str, force: bool) -> ContainerResult<()> {
        self.calls.lock().unwrap().push(RuntimeCall::Remove {
            container: container.to_string(),
            force,
        });
        self.check_available()?;
        if self.containers.lock().unwrap().remove(container) {
            Ok(())
        } else {
            Err(ContainerError::ContainerNotFound(container.to_string()))
        }
    }

    async fn container_state_status(&self, container: &str) -> ContainerResult<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .push(RuntimeCall::Inspect(container.to_string()));
        self.check_available()?;
        Ok(self.exists(container).then(|| "running".to_string()))
    }
}

/// Run task lookup returning a fixed answer and counting calls.
#[derive(Default)]
pub struct CountingLookup {
    run: Option<RunDefinition>,
    calls: AtomicUsize,
}

impl CountingLookup {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_container(container: &str) -> Self {
        Self {
            run: Some(RunDefinition {
                label: "docker-run: debug".to_string(),
                docker_run: DockerRunOptions {
                    container_name: Some(container.to_string()),
                    ..Default::default()
                },
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunTaskLookup for CountingLookup {
    async fn find_associated_run_task(&self, _request: &DebugRequest) -> Result<Option<RunDefinition>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.run.clone())
    }
}

/// Helper returning a canned session, or failing.
pub struct CannedHelper {
    response: Option<ResolvedSession>,
    fail: bool,
    calls: AtomicUsize,
}

impl CannedHelper {
    pub fn returning(session: ResolvedSession) -> Self {
        Self {
            response: Some(session),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DebugHelper for CannedHelper {
    async fn resolve_debug_configuration(
        &self,
        _context: &DebugContext,
        _request: &DebugRequest,
    ) -> Result<Option<ResolvedSession>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("helper exploded"));
        }
        Ok(self.response.clone())
    }
}

pub type Report = (String, BTreeMap<String, String>, String);

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, context: &ActionContext, error: &(dyn std::error::Error + 'static)) {
        self.reports.lock().unwrap().push((
            context.action().to_string(),
            context.properties(),
            error.to_string(),
        ));
    }
}

/// Prompter that answers with a fixed choice.
pub struct RecordingPrompter {
    accept: bool,
    messages: Mutex<Vec<(String, Vec<MessageItem>)>>,
}

impl RecordingPrompter {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn dismissing() -> Self {
        Self {
            accept: false,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(String, Vec<MessageItem>)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for RecordingPrompter {
    async fn show_error_message(
        &self,
        message: &str,
        items: &[MessageItem],
    ) -> Option<MessageItem> {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), items.to_vec()));
        if self.accept {
            items.first().cloned()
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct RecordingCommands {
    executed: Mutex<Vec<String>>,
}

impl RecordingCommands {
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingCommands {
    async fn execute_command(&self, command: &str) -> Result<()> {
        self.executed.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

/// A provider wired to in-memory fakes.
pub struct Harness {
    pub provider: DockerDebugConfigurationProvider,
    pub runtime: Arc<RecordingRuntime>,
    pub lookup: Arc<CountingLookup>,
    pub reporter: Arc<RecordingReporter>,
    pub supervisor: Arc<LifecycleSupervisor>,
    pub folder: WorkspaceFolder,
    _dir: TempDir,
}

pub struct HarnessBuilder {
    runtime: RecordingRuntime,
    lookup: CountingLookup,
    registry: PlatformRegistry,
    open_folder: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            runtime: RecordingRuntime::default(),
            lookup: CountingLookup::none(),
            registry: default_registry(),
            open_folder: true,
        }
    }

    pub fn runtime(mut self, runtime: RecordingRuntime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn lookup(mut self, lookup: CountingLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn without_folder(mut self) -> Self {
        self.open_folder = false;
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().expect("create temp workspace");
        let folder = WorkspaceFolder::new("shop", dir.path());
        let workspace = if self.open_folder {
            StaticWorkspace::new(vec![folder.clone()])
        } else {
            StaticWorkspace::empty()
        };

        let runtime = Arc::new(self.runtime);
        let lookup = Arc::new(self.lookup);
        let reporter = Arc::new(RecordingReporter::default());
        let supervisor = Arc::new(LifecycleSupervisor::new(
            runtime.clone(),
            TerminationEvents::default(),
        ));

        let provider = DockerDebugConfigurationProvider::new(
            Arc::new(workspace),
            lookup.clone(),
            self.registry,
            Arc::clone(&supervisor),
        )
        .with_reporter(reporter.clone());

        Harness {
            provider,
            runtime,
            lookup,
            reporter,
            supervisor,
            folder,
            _dir: dir,
        }
    }
}

/// Registry routing every platform to `helper`.
pub fn registry_with(helper: Arc<dyn DebugHelper>) -> PlatformRegistry {
    DockerPlatform::ALL
        .into_iter()
        .fold(PlatformRegistry::new(), |registry, platform| {
            registry.register(platform, Arc::clone(&helper))
        })
}

/// Run `fut` with a deadline so a broken supervisor fails instead of hanging.
pub async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}
