//! Debug configuration provider: the entry point for debug requests.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use dbgbox_protocol::{DebugRequest, ORCHESTRATION_SINGLE, ResolvedSession};

use super::error::{DebugError, DebugResult};
use super::platform::{PlatformRegistry, get_platform};
use super::supervisor::LifecycleSupervisor;
use super::DebugContext;
use crate::prompt::{CommandExecutor, ConsolePrompter, MessageItem, NoopCommands, Prompter};
use crate::tasks::RunTaskLookup;
use crate::telemetry::{
    ActionContext, ErrorReporter, LogErrorReporter, call_with_telemetry_and_error_handling,
};
use crate::workspace::{WorkspaceFolder, WorkspaceProvider};

/// Shown when debugging starts without any configuration.
pub const DISCOVERY_MESSAGE: &str = "To debug in a Docker container on supported platforms, \
run \"dbgbox configure\" to add Docker files to the workspace, or click \"Add Docker Files\".";

/// Action offered with [`DISCOVERY_MESSAGE`].
pub const ADD_DOCKER_FILES: &str = "Add Docker Files";

/// Command run when the user accepts [`ADD_DOCKER_FILES`].
pub const CONFIGURE_COMMAND: &str = "dbgbox.configure";

/// Check that a helper produced a startable session.
pub fn validate_resolved_session(session: &ResolvedSession) -> DebugResult<()> {
    if session
        .debug_type
        .as_deref()
        .is_none_or(|t| t.trim().is_empty())
    {
        return Err(DebugError::MissingType);
    }
    if session.request.is_none() {
        return Err(DebugError::MissingRequest);
    }
    Ok(())
}

async fn discovery_prompt(prompter: Arc<dyn Prompter>, commands: Arc<dyn CommandExecutor>) {
    let add = MessageItem::new(ADD_DOCKER_FILES);
    let chosen = prompter
        .show_error_message(DISCOVERY_MESSAGE, std::slice::from_ref(&add))
        .await;

    if chosen.as_ref() != Some(&add) {
        debug!("discovery prompt dismissed");
        return;
    }

    if let Err(e) = commands.execute_command(CONFIGURE_COMMAND).await {
        warn!("{} failed: {:#}", CONFIGURE_COMMAND, e);
    }
}

/// Resolves debug requests into container debug sessions.
pub struct DockerDebugConfigurationProvider {
    workspace: Arc<dyn WorkspaceProvider>,
    tasks: Arc<dyn RunTaskLookup>,
    registry: PlatformRegistry,
    supervisor: Arc<LifecycleSupervisor>,
    reporter: Arc<dyn ErrorReporter>,
    prompter: Arc<dyn Prompter>,
    commands: Arc<dyn CommandExecutor>,
}

impl DockerDebugConfigurationProvider {
    pub fn new(
        workspace: Arc<dyn WorkspaceProvider>,
        tasks: Arc<dyn RunTaskLookup>,
        registry: PlatformRegistry,
        supervisor: Arc<LifecycleSupervisor>,
    ) -> Self {
        Self {
            workspace,
            tasks,
            registry,
            supervisor,
            reporter: Arc::new(LogErrorReporter),
            prompter: Arc::new(ConsolePrompter::default()),
            commands: Arc::new(NoopCommands),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_discovery(
        mut self,
        prompter: Arc<dyn Prompter>,
        commands: Arc<dyn CommandExecutor>,
    ) -> Self {
        self.prompter = prompter;
        self.commands = commands;
        self
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn supervisor(&self) -> &Arc<LifecycleSupervisor> {
        &self.supervisor
    }

    /// Called when no debug configuration exists yet.
    ///
    /// Offers guided setup in the background and returns no configurations.
    /// Must be called from within a Tokio runtime.
    pub fn provide_debug_configurations(
        &self,
        _folder: Option<&WorkspaceFolder>,
    ) -> Vec<DebugRequest> {
        tokio::spawn(discovery_prompt(
            Arc::clone(&self.prompter),
            Arc::clone(&self.commands),
        ));
        Vec::new()
    }

    /// Show the guided setup prompt and wait for it to finish.
    pub async fn run_discovery_prompt(&self) {
        discovery_prompt(Arc::clone(&self.prompter), Arc::clone(&self.commands)).await;
    }

    /// Resolve `request` into a session.
    ///
    /// `Ok(None)` means there is nothing to debug yet (no `type`), or the
    /// helper declined. Errors are reported before being returned.
    pub async fn resolve_debug_configuration(
        &self,
        folder: Option<WorkspaceFolder>,
        request: &DebugRequest,
        cancellation: CancellationToken,
    ) -> DebugResult<Option<ResolvedSession>> {
        let action = if request.is_attach() {
            "docker-attach"
        } else {
            "docker-launch"
        };

        call_with_telemetry_and_error_handling(self.reporter.as_ref(), action, |context| {
            self.resolve_with_context(context, folder, request, cancellation)
        })
        .await
    }

    async fn resolve_with_context(
        &self,
        context: ActionContext,
        folder: Option<WorkspaceFolder>,
        request: &DebugRequest,
        cancellation: CancellationToken,
    ) -> DebugResult<Option<ResolvedSession>> {
        let folder = match folder {
            Some(folder) => folder,
            None => self
                .workspace
                .current_folders()
                .into_iter()
                .next()
                .ok_or(DebugError::NoWorkspace)?,
        };

        if request.debug_type.is_none() {
            // F5 without a launch configuration; discovery takes over.
            debug!("debug request has no type, nothing to resolve");
            return Ok(None);
        }

        if request.request.is_none() {
            return Err(DebugError::MissingRequestKind);
        }

        let platform = get_platform(request);
        context.set_property("platform", platform.clone());
        context.set_property("orchestration", ORCHESTRATION_SINGLE);

        self.resolve_internal(folder, &platform, request, cancellation)
            .await
    }

    async fn resolve_internal(
        &self,
        folder: WorkspaceFolder,
        platform_tag: &str,
        request: &DebugRequest,
        cancellation: CancellationToken,
    ) -> DebugResult<Option<ResolvedSession>> {
        let run_definition = self
            .tasks
            .find_associated_run_task(request)
            .await
            .map_err(DebugError::TaskLookup)?;

        let (platform, helper) = self.registry.resolve(platform_tag)?;

        let context = DebugContext {
            folder,
            platform,
            run_definition,
            cancellation,
        };
        let resolved = helper.resolve_debug_configuration(&context, request).await?;

        if let Some(session) = &resolved {
            validate_resolved_session(session)?;
            self.supervisor.arm(session).await;
            info!(
                "resolved {} {} session in '{}'",
                platform,
                session.request.map(|r| r.as_str()).unwrap_or("?"),
                context.folder.name
            );
        }

        Ok(resolved)
    }
}
