// crates/sweep-cli/src/main.rs
// ============================================================================
// Module: Sweep Runner CLI Entry Point
// Description: Command-line front end for sweep campaigns and workers.
// Purpose: Wire configuration, stores, devices, and workers into a campaign.
// Dependencies: clap, sweep-config, sweep-core, sweep-runner, sweep stores
// ============================================================================

//! ## Overview
//! `sweep-runner` loads `sweep-harness.toml`, selects the store backend once,
//! registers the configured modules, and drives a campaign. The same binary
//! re-executes itself with the hidden `worker` subcommand to host one device
//! session per worker process.
//!
//! Exit codes: `1` when the selection is inconsistent, the configuration is
//! invalid, or a named module is unknown; `0` otherwise, even when suites
//! fail, since every outcome is recorded in the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use sweep_config::HarnessConfig;
use sweep_config::LogSink;
use sweep_config::LoggingConfig;
use sweep_config::ModuleConfig;
use sweep_config::StoreBackend;
use sweep_config::StoreConfig;
use sweep_core::DeviceOptions;
use sweep_core::DeviceReset;
use sweep_core::EventSink;
use sweep_core::FileEventSink;
use sweep_core::ModuleName;
use sweep_core::NoopEventSink;
use sweep_core::StderrEventSink;
use sweep_core::SuiteName;
use sweep_core::SweepStore;
use sweep_core::VectorId;
use sweep_runner::CampaignDriver;
use sweep_runner::CampaignSelection;
use sweep_runner::CampaignSummary;
use sweep_runner::CommandModule;
use sweep_runner::CommandReset;
use sweep_runner::ExecutorOptions;
use sweep_runner::HostContext;
use sweep_runner::ModuleRegistry;
use sweep_runner::NoopReset;
use sweep_runner::ProcessWorkerSpawner;
use sweep_runner::ResultExporter;
use sweep_runner::SuiteExecutor;
use sweep_runner::WorkerCommand;
use sweep_runner::git_revision;
use sweep_runner::serve_worker;
use sweep_store_elastic::ElasticSettings;
use sweep_store_elastic::ElasticStore;
use sweep_store_elastic::Url;
use sweep_store_json::JsonFileStore;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the bundled simulated device host binary.
const SIM_DEVICE_BIN: &str = "sweep-sim-device";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Sweep test harness.
#[derive(Parser, Debug)]
#[command(name = "sweep-runner", disable_help_subcommand = true)]
struct Cli {
    /// Path to `sweep-harness.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Campaign selection and switches.
    #[command(flatten)]
    run: RunArgs,
    /// Internal subcommands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Campaign arguments.
#[derive(Args, Debug)]
struct RunArgs {
    /// Run only this module.
    #[arg(long = "module-name", value_name = "MODULE")]
    module_name: Option<String>,
    /// Run only this suite of the module.
    #[arg(long = "suite-name", value_name = "SUITE")]
    suite_name: Option<String>,
    /// Run a single vector of the module.
    #[arg(long = "vector-id", value_name = "VECTOR_ID")]
    vector_id: Option<String>,
    /// Enable watcher diagnostics in device processes.
    #[arg(long, action = ArgAction::SetTrue)]
    watcher: bool,
    /// Measure end-to-end performance (each vector runs twice).
    #[arg(long, action = ArgAction::SetTrue)]
    perf: bool,
    /// Log intended executions without running them.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve one device session over stdin/stdout.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// Worker subcommand arguments.
#[derive(Args, Debug)]
struct WorkerArgs {
    /// Module whose device this worker owns.
    #[arg(long, value_name = "MODULE")]
    module: String,
    /// Enable watcher diagnostics in the device host.
    #[arg(long, action = ArgAction::SetTrue)]
    watcher: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Worker(args)) => command_worker(cli.config.as_deref(), &args),
        None => command_campaign(cli.config.as_deref(), &cli.run),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs a campaign.
fn command_campaign(config_path: Option<&Path>, args: &RunArgs) -> CliResult<ExitCode> {
    let selection = CampaignSelection {
        module: args.module_name.as_deref().map(ModuleName::from),
        suite: args.suite_name.as_deref().map(SuiteName::from),
        vector_id: args.vector_id.as_deref().map(VectorId::from),
    };
    selection.validate().map_err(|err| CliError::new(err.to_string()))?;
    let config = load_config(config_path)?;
    let events = build_event_sink(&config.logging)?;
    let store = build_store(&config.store)?;
    let registry = build_registry(&config)?;

    let watcher_env = if args.watcher { config.watcher.env() } else { Vec::new() };
    let spawner = ProcessWorkerSpawner::new(
        worker_command(config_path, args.watcher, watcher_env.clone())?,
        config.execution.shutdown_grace(),
    );
    let reset: Box<dyn DeviceReset> = if config.reset.command.is_empty() {
        Box::new(NoopReset)
    } else {
        Box::new(CommandReset::new(config.reset.command.clone()))
    };
    let host = HostContext::detect();
    let options = ExecutorOptions {
        perf: args.perf,
        dry_run: args.dry_run,
        default_timeout: config.execution.default_timeout(),
        device_class: config.reset.resolved_device_class(),
        device_options: DeviceOptions {
            watcher: args.watcher,
            env: watcher_env,
        },
    };
    let executor = SuiteExecutor::new(&spawner, reset.as_ref(), events.as_ref(), &host, options);
    let driver = CampaignDriver::new(
        store.as_ref(),
        &registry,
        executor,
        ResultExporter::new(git_revision()),
        events.as_ref(),
    );
    let summary = driver.run(&selection).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&summary_line(&summary))
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Serves one device session for a parent harness.
fn command_worker(config_path: Option<&Path>, args: &WorkerArgs) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let module_config = config
        .module(&args.module)
        .ok_or_else(|| CliError::new(format!("sweep module not found: {}", args.module)))?;
    let module = command_module(&config, module_config)?;
    let events = build_event_sink(&config.logging)?;
    let options = DeviceOptions {
        watcher: args.watcher,
        env: if args.watcher { config.watcher.env() } else { Vec::new() },
    };
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();
    serve_worker(&module, &options, &mut reader, &mut writer, events.as_ref())
        .map_err(|err| CliError::new(format!("worker {}: {err}", args.module)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<HarnessConfig> {
    HarnessConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Builds the configured event sink.
fn build_event_sink(logging: &LoggingConfig) -> CliResult<Box<dyn EventSink>> {
    match logging.sink {
        LogSink::Stderr => Ok(Box::new(StderrEventSink)),
        LogSink::None => Ok(Box::new(NoopEventSink)),
        LogSink::File => {
            let path = logging
                .path
                .as_deref()
                .ok_or_else(|| CliError::new("file log sink requires logging.path"))?;
            let sink = FileEventSink::new(path).map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            })?;
            Ok(Box::new(sink))
        }
    }
}

/// Builds the configured store backend.
fn build_store(config: &StoreConfig) -> CliResult<Box<dyn SweepStore>> {
    match config.backend {
        StoreBackend::Json => Ok(Box::new(JsonFileStore::new(config.json.path.clone()))),
        StoreBackend::Elastic => {
            let elastic = config
                .elastic
                .as_ref()
                .ok_or_else(|| CliError::new("elastic backend requires [store.elastic]"))?;
            let url = Url::parse(&elastic.url)
                .map_err(|err| CliError::new(format!("invalid store.elastic.url: {err}")))?;
            let credentials =
                match (env::var(&elastic.username_env), env::var(&elastic.password_env)) {
                    (Ok(username), Ok(password)) => Some((username, password)),
                    _ => None,
                };
            let store = ElasticStore::new(ElasticSettings {
                url,
                credentials,
                vector_index_prefix: elastic.vector_index_prefix.clone(),
                result_index_prefix: elastic.result_index_prefix.clone(),
                timeout: elastic.timeout(),
                max_hits: elastic.max_hits,
            })
            .map_err(|err| CliError::new(err.to_string()))?;
            Ok(Box::new(store))
        }
    }
}

/// Registers every configured module.
fn build_registry(config: &HarnessConfig) -> CliResult<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    for module in &config.modules {
        registry.register(Arc::new(command_module(config, module)?));
    }
    Ok(registry)
}

/// Builds a command-backed module, defaulting to the simulated device host.
fn command_module(config: &HarnessConfig, module: &ModuleConfig) -> CliResult<CommandModule> {
    let mut argv = config.device_command(module);
    if argv.is_empty() {
        argv = vec![sibling_binary(SIM_DEVICE_BIN)?.to_string_lossy().into_owned()];
    }
    Ok(CommandModule::new(ModuleName::new(module.name.clone()), module.timeout(), argv))
}

/// Builds the command line that re-executes this binary as a worker.
fn worker_command(
    config_path: Option<&Path>,
    watcher: bool,
    worker_env: Vec<(String, String)>,
) -> CliResult<WorkerCommand> {
    let program = env::current_exe()
        .map_err(|err| CliError::new(format!("cannot locate harness executable: {err}")))?;
    let mut args = Vec::new();
    if let Some(path) = config_path {
        args.push("--config".to_string());
        args.push(path.to_string_lossy().into_owned());
    }
    args.push("worker".to_string());
    if watcher {
        args.push("--watcher".to_string());
    }
    Ok(WorkerCommand {
        program,
        args,
        env: worker_env,
    })
}

/// Resolves a binary installed next to this executable.
fn sibling_binary(name: &str) -> CliResult<PathBuf> {
    let exe = env::current_exe()
        .map_err(|err| CliError::new(format!("cannot locate harness executable: {err}")))?;
    let dir = exe
        .parent()
        .ok_or_else(|| CliError::new("harness executable has no parent directory"))?;
    Ok(dir.join(format!("{name}{}", env::consts::EXE_SUFFIX)))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Renders the campaign summary line.
fn summary_line(summary: &CampaignSummary) -> String {
    let statuses = summary.status_line();
    let mut line = format!(
        "suites_run={} suites_failed={} vectors={}",
        summary.suites_run, summary.suites_failed, summary.vectors_executed
    );
    if !statuses.is_empty() {
        line.push(' ');
        line.push_str(&statuses);
    }
    line
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
