use std::env;
use std::fmt;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dbgbox::container::{
    ContainerRuntime, ContainerRuntimeApi, RuntimeType, WatchOutcome, is_active_state,
    wait_for_container, watch_until_stopped,
};
use dbgbox::debug::{
    DockerDebugConfigurationProvider, LifecycleSupervisor, TerminationEvents, default_registry,
};
use dbgbox::prompt::ConsolePrompter;
use dbgbox::protocol::{DebugRequest, DockerPlatform, ResolvedSession, TerminationEvent};
use dbgbox::scaffold::{ScaffoldCommands, tasks_path};
use dbgbox::tasks::TaskFileLookup;
use dbgbox::workspace::{StaticWorkspace, WorkspaceFolder};

const APP_NAME: &str = "dbgbox";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_resolve(ctx: RuntimeContext, cmd: RequestCommand) -> Result<()> {
    handle_resolve(&ctx, cmd).await
}

#[tokio::main]
async fn async_debug(ctx: RuntimeContext, cmd: DebugCommand) -> Result<()> {
    handle_debug(&ctx, cmd).await
}

#[tokio::main]
async fn async_provide(ctx: RuntimeContext, cmd: ScaffoldCommand) -> Result<()> {
    handle_provide(&ctx, cmd).await
}

#[tokio::main]
async fn async_configure(ctx: RuntimeContext, cmd: ConfigureCommand) -> Result<()> {
    handle_configure(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    match cli.command {
        Command::Resolve(cmd) => async_resolve(ctx, cmd),
        Command::Debug(cmd) => async_debug(ctx, cmd),
        Command::Provide(cmd) => async_provide(ctx, cmd),
        Command::Configure(cmd) => async_configure(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "dbgbox - debug sessions in Docker containers.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Output machine readable JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    json: bool,
    /// Output machine readable YAML
    #[arg(long, global = true)]
    yaml: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Do not change anything on disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Assume "yes" for interactive prompts
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,
    /// Maximum seconds to follow a debug container
    #[arg(long = "timeout", value_name = "SECONDS", global = true)]
    timeout: Option<u64>,
    /// Emit additional diagnostics for troubleshooting
    #[arg(long = "diagnostics", global = true)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a debug request and print the resulting session
    Resolve(RequestCommand),
    /// Resolve a debug request and follow its container until the session ends
    Debug(DebugCommand),
    /// Show guided setup when no debug configuration exists
    Provide(ScaffoldCommand),
    /// Add Docker debug files to the workspace
    Configure(ConfigureCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct RequestCommand {
    /// Debug request JSON, or a launch file with a `configurations` list
    #[arg(value_name = "REQUEST.json")]
    request: PathBuf,
    /// Configuration to pick from a launch file (defaults to the first)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Workspace folder to resolve against (defaults to the first configured)
    #[arg(long, value_name = "PATH")]
    folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct DebugCommand {
    #[command(flatten)]
    request: RequestCommand,
    /// Start the container if it exists but is not running
    #[arg(long)]
    start: bool,
}

#[derive(Debug, Clone, Args)]
struct ScaffoldCommand {
    /// Platform used when writing starter files
    #[arg(long, default_value_t = DockerPlatform::Node)]
    platform: DockerPlatform,
}

#[derive(Debug, Clone, Args)]
struct ConfigureCommand {
    #[command(flatten)]
    scaffold: ScaffoldCommand,
    /// Overwrite existing files
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths, &common)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::fmt::writer::BoxMakeWriter;
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level}")));

        let (writer, to_file) = match self.config.logging.file {
            Some(ref file) => {
                let path = Path::new(file);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating log directory {}", parent.display()))?;
                }
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                (BoxMakeWriter::new(Mutex::new(file)), true)
            }
            None => (BoxMakeWriter::new(io::stderr), false),
        };

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = to_file
                || self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(!disable_color)
                        .with_target(self.common.diagnostics)
                        .with_file(self.common.diagnostics)
                        .with_line_number(self.common.diagnostics),
                )
                .try_init()
                .ok();
        }

        // The library logs through `log`; route it as well.
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();

        Ok(())
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self
                    .config
                    .logging
                    .level
                    .parse()
                    .unwrap_or(LevelFilter::Info),
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn container_runtime(&self) -> Result<ContainerRuntime> {
        let cfg = &self.config.container;
        let binary = cfg
            .binary
            .as_deref()
            .map(expand_str_path)
            .transpose()?
            .map(|p| p.display().to_string());

        Ok(match (cfg.runtime, binary) {
            (Some(runtime), Some(binary)) => ContainerRuntime::with_binary(runtime, binary),
            (Some(runtime), None) => ContainerRuntime::with_type(runtime),
            (None, Some(binary)) => ContainerRuntime::with_binary(RuntimeType::default(), binary),
            (None, None) => ContainerRuntime::new(),
        })
    }

    /// Configured workspace folders, or the current directory.
    fn workspace_folders(&self) -> Result<Vec<WorkspaceFolder>> {
        if self.config.workspace.folders.is_empty() {
            let cwd = env::current_dir().context("reading current directory")?;
            return Ok(vec![WorkspaceFolder::from_path(cwd)]);
        }
        self.config
            .workspace
            .folders
            .iter()
            .map(|folder| expand_str_path(folder).map(WorkspaceFolder::from_path))
            .collect()
    }

    fn primary_folder(&self, folder: Option<&Path>) -> Result<WorkspaceFolder> {
        if let Some(path) = folder {
            return Ok(WorkspaceFolder::from_path(expand_path(path.to_path_buf())?));
        }
        self.workspace_folders()?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no workspace folder configured"))
    }

    fn tasks_file(&self, folder: &WorkspaceFolder) -> Result<PathBuf> {
        match self.config.tasks.file {
            Some(ref file) => {
                let path = expand_str_path(file)?;
                Ok(if path.is_absolute() {
                    path
                } else {
                    folder.join(path)
                })
            }
            None => Ok(tasks_path(folder)),
        }
    }

    fn build_engine(&self, folder: &WorkspaceFolder, platform: DockerPlatform) -> Result<Engine> {
        let runtime = Arc::new(self.container_runtime()?);
        debug!(
            "using {} runtime at '{}'",
            runtime.runtime_type(),
            runtime.binary()
        );

        let events = TerminationEvents::new();
        let supervisor = Arc::new(
            LifecycleSupervisor::new(runtime.clone(), events)
                .with_externally_managed_types(self.config.debug.externally_managed_types.clone()),
        );

        let tasks = TaskFileLookup::new(self.tasks_file(folder)?);
        debug!("reading tasks from {}", tasks.path().display());

        let provider = DockerDebugConfigurationProvider::new(
            Arc::new(StaticWorkspace::new(self.workspace_folders()?)),
            Arc::new(tasks),
            default_registry(),
            Arc::clone(&supervisor),
        )
        .with_discovery(
            Arc::new(ConsolePrompter::new(self.common.assume_yes)),
            Arc::new(ScaffoldCommands::new(folder.clone(), platform)),
        );

        Ok(Engine {
            provider,
            supervisor,
            runtime,
        })
    }

    fn print<T: Serialize + fmt::Debug>(&self, value: &T) -> Result<()> {
        if self.common.json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).context("serializing output to JSON")?
            );
        } else if self.common.yaml {
            println!(
                "{}",
                serde_yaml::to_string(value).context("serializing output to YAML")?
            );
        } else {
            println!("{value:#?}");
        }
        Ok(())
    }
}

struct Engine {
    provider: DockerDebugConfigurationProvider,
    supervisor: Arc<LifecycleSupervisor>,
    runtime: Arc<ContainerRuntime>,
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self { config_file })
    }
}

impl fmt::Display for AppPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config: {}", self.config_file.display())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    container: ContainerRuntimeConfig,
    debug: DebugConfig,
    workspace: WorkspaceConfig,
    tasks: TasksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
    file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ContainerRuntimeConfig {
    /// Container runtime type: "docker" or "podman" (auto-detected if not set)
    runtime: Option<RuntimeType>,
    /// Custom path to the container runtime binary
    binary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct DebugConfig {
    /// Debug types whose containers are not removed before a session starts
    externally_managed_types: Vec<String>,
    /// Container polling interval while following a session
    watch_interval_ms: u64,
    /// How long to wait for container removal after a session ends
    disposal_timeout_secs: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            externally_managed_types: dbgbox::debug::supervisor::DEFAULT_EXTERNALLY_MANAGED_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            watch_interval_ms: 1000,
            disposal_timeout_secs: 30,
        }
    }
}

impl DebugConfig {
    fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(10))
    }

    fn disposal_timeout(&self) -> Duration {
        Duration::from_secs(self.disposal_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WorkspaceConfig {
    /// Workspace folders in order; empty means the current directory
    folders: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct TasksConfig {
    /// Tasks file, relative to the first workspace folder unless absolute
    file: Option<String>,
}

/// Read a debug request. Launch files pick the named configuration, or the
/// first one.
fn load_request(path: &Path, name: Option<&str>) -> Result<DebugRequest> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let value = match value.get("configurations") {
        Some(Value::Array(configurations)) => {
            let picked = match name {
                Some(name) => configurations
                    .iter()
                    .find(|c| c.get("name").and_then(Value::as_str) == Some(name)),
                None => configurations.first(),
            };
            picked.cloned().ok_or_else(|| match name {
                Some(name) => anyhow!("no configuration named '{name}' in {}", path.display()),
                None => anyhow!("{} has no configurations", path.display()),
            })?
        }
        _ => value,
    };

    serde_json::from_value(value).with_context(|| format!("invalid debug request in {}", path.display()))
}

async fn resolve_request(
    ctx: &RuntimeContext,
    cmd: &RequestCommand,
    cancellation: CancellationToken,
) -> Result<(Engine, DebugRequest, Option<ResolvedSession>)> {
    let request = load_request(&cmd.request, cmd.name.as_deref())?;
    let folder = ctx.primary_folder(cmd.folder.as_deref())?;
    let platform = request
        .platform
        .as_deref()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DockerPlatform::Node);
    let engine = ctx.build_engine(&folder, platform)?;

    let session = engine
        .provider
        .resolve_debug_configuration(Some(folder), &request, cancellation)
        .await?;
    Ok((engine, request, session))
}

async fn handle_resolve(ctx: &RuntimeContext, cmd: RequestCommand) -> Result<()> {
    let (engine, _, session) = resolve_request(ctx, &cmd, CancellationToken::new()).await?;
    ctx.print(&session)?;
    engine.supervisor.shutdown();
    Ok(())
}

async fn handle_debug(ctx: &RuntimeContext, cmd: DebugCommand) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, ending debug session");
            on_signal.cancel();
        }
    });

    let (engine, request, session) = resolve_request(ctx, &cmd.request, cancel.child_token()).await?;

    let Some(session) = session else {
        if request.debug_type.is_none() {
            engine.provider.run_discovery_prompt().await;
        } else {
            info!("debug request was not resolved");
        }
        return Ok(());
    };
    ctx.print(&session)?;

    let Some(container) = session.container_name_to_kill().map(str::to_string) else {
        info!("session has no container to follow");
        return Ok(());
    };

    match engine.runtime.health_check().await {
        Ok(version) => debug!("{} {}", engine.runtime.runtime_type(), version),
        Err(e) => warn!("container runtime check failed: {}", e),
    }

    let interval = ctx.config.debug.watch_interval();
    let follow = follow_container(&*engine.runtime, &container, interval, &cancel, cmd.start);
    let outcome = match ctx.common.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), follow)
            .await
            .unwrap_or_else(|_| {
                warn!("stopped following '{}' after {}s", container, secs);
                Ok(WatchOutcome::Cancelled)
            }),
        None => follow.await,
    };

    let delivered = engine.supervisor.events().emit(TerminationEvent::new(
        Uuid::new_v4().to_string(),
        Some(session.clone()),
    ));
    debug!("termination event delivered to {} listener(s)", delivered);

    if tokio::time::timeout(
        ctx.config.debug.disposal_timeout(),
        engine.supervisor.wait_disposed(&container),
    )
    .await
    .is_err()
    {
        warn!("container '{}' was not cleaned up in time", container);
    }
    engine.supervisor.shutdown();

    let outcome = outcome.with_context(|| format!("following container '{container}'"))?;
    info!("debug session for '{}' ended: {:?}", container, outcome);
    Ok(())
}

async fn follow_container(
    runtime: &dyn ContainerRuntimeApi,
    container: &str,
    interval: Duration,
    cancel: &CancellationToken,
    start: bool,
) -> Result<WatchOutcome> {
    info!("waiting for container '{}'", container);
    let Some(state) = wait_for_container(runtime, container, interval, cancel).await? else {
        return Ok(WatchOutcome::Cancelled);
    };

    if state == "created" || (start && !is_active_state(&state)) {
        info!("starting container '{}' ({})", container, state);
        runtime.start_container(container).await?;
    }

    Ok(watch_until_stopped(runtime, container, interval, cancel).await?)
}

async fn handle_provide(ctx: &RuntimeContext, cmd: ScaffoldCommand) -> Result<()> {
    let folder = ctx.primary_folder(None)?;
    let engine = ctx.build_engine(&folder, cmd.platform)?;
    engine.provider.run_discovery_prompt().await;
    ctx.print(&Vec::<DebugRequest>::new())
}

async fn handle_configure(ctx: &RuntimeContext, cmd: ConfigureCommand) -> Result<()> {
    let folder = ctx.primary_folder(None)?;
    if ctx.common.dry_run {
        info!(
            "dry-run: would write {} debug files to {}",
            cmd.scaffold.platform,
            folder.path.display()
        );
        return Ok(());
    }

    let written = ScaffoldCommands::new(folder, cmd.scaffold.platform)
        .force(cmd.force || ctx.common.assume_yes)
        .scaffold()
        .await?;
    ctx.print(&written)
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => ctx.print(&ctx.config),
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

fn load_or_init_config(paths: &AppPaths, common: &CommonOpts) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        if common.dry_run {
            info!(
                "dry-run: would create default config at {}",
                paths.config_file.display()
            );
        } else {
            write_default_config(&paths.config_file)?;
        }
    }

    read_config(&paths.config_file, &env_prefix())
}

fn read_config(path: &Path, env_prefix: &str) -> Result<AppConfig> {
    let built = Config::builder()
        .set_default("logging.level", "info")?
        .set_default("debug.watch_interval_ms", 1000_i64)?
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("debug.externally_managed_types")
                .with_list_parse_key("workspace.folders")
                .try_parsing(true),
        )
        .build()?;

    let mut config: AppConfig = built.try_deserialize()?;

    if let Some(ref file) = config.logging.file {
        let expanded = expand_str_path(file)?;
        config.logging.file = Some(expanded.display().to_string());
    }

    Ok(config)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    format!(
        "# Configuration for {APP_NAME}\n# File: {}\n\n",
        path.display()
    )
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
