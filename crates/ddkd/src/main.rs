// # ddkd - DDK Daemon
//
// Thin integration layer over `ddk-core`:
// 1. Parse the command line and load the TOML config
// 2. Initialize tracing and the runtime
// 3. Run the post-startup command
// 4. Register providers and start one worker per record
// 5. Wait for SIGTERM/SIGINT and stop the workers
//
// All synchronization logic lives in `ddk-core`.
//
// ## Example
//
// ```bash
// ddkd --config /etc/ddk/config.toml --log-level debug
// DDK_CONFIG=./config.toml ddkd
// ```

mod config;

use anyhow::Result;
use clap::Parser;
use ddk_core::{
    CommandRunner, DdkConfig, ProcessCommandRunner, UpdateDedupRegistry, UpdaterRegistry, Worker,
    shutdown_channel,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

use config::{CONFIG_ENV, load_config, parse_log_level, resolve_config_path};

/// How long workers get to finish an in-flight tick after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdkExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdkExitCode> for ExitCode {
    fn from(code: DdkExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep DNS records pointed at this host's current address
#[derive(Debug, Parser)]
#[command(name = "ddkd", version, about)]
struct Cli {
    /// Path to the TOML config file [default: /etc/ddk/config.toml]
    ///
    /// A non-empty DDK_CONFIG environment variable takes precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DDK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdkExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdkExitCode::ConfigError.into();
    }

    let config_path = resolve_config_path(cli.config, std::env::var_os(CONFIG_ENV));

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DdkExitCode::ConfigError.into();
        }
    };

    info!("Starting ddkd daemon");
    info!(
        "Configuration loaded from {}: {} record(s)",
        config_path.display(),
        config.records.len()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdkExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DdkExitCode::RuntimeError
        } else {
            DdkExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register built-in providers
fn register_providers(registry: &UpdaterRegistry) {
    #[cfg(feature = "aliyun")]
    {
        info!("Registering Aliyun provider");
        ddk_provider_aliyun::register(registry);
    }

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        ddk_provider_cloudflare::register(registry);
    }

    if registry.list().is_empty() {
        warn!("No providers compiled in; every record will be skipped");
    }
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: DdkConfig) -> Result<()> {
    // Installed first so a signal during the startup wait is not lost
    let mut signals = ShutdownSignals::install()?;

    let registry = UpdaterRegistry::new();
    register_providers(&registry);

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessCommandRunner::new());

    if let Some(wait) = config.global.post_up_wait() {
        info!("Waiting {}s before startup", wait.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            signal = signals.recv() => {
                info!("Received shutdown signal during startup wait: {}", signal?);
                return Ok(());
            }
        }
    }

    if let Some(command) = config.global.post_up_cmd() {
        info!("Running post_up_cmd: {}", command);
        let steps = runner.run_sequence(command).await;
        let failed = steps.iter().filter(|step| !step.succeeded()).count();
        if failed > 0 {
            warn!("post_up_cmd: {} of {} step(s) failed", failed, steps.len());
        }
    }

    let dedup = Arc::new(UpdateDedupRegistry::new());
    let (trigger, shutdown) = shutdown_channel();
    let mut workers = JoinSet::new();

    for (index, record) in config.records.iter().enumerate() {
        match Worker::new(
            record,
            &config.global,
            &registry,
            Arc::clone(&runner),
            Arc::clone(&dedup),
        ) {
            Ok(worker) => {
                info!("Starting worker for {} ({})", worker.record_label(), worker.registrar());
                workers.spawn(worker.run(shutdown.clone()));
            }
            Err(e) => {
                error!(
                    record = index + 1,
                    registrar = %record.domain_registrar,
                    error = %e,
                    "Skipping record"
                );
            }
        }
    }
    drop(shutdown);

    if workers.is_empty() {
        warn!("No record could be started, waiting for shutdown signal");
    } else {
        info!("{} worker(s) running", workers.len());
    }

    let signal = signals.recv().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    trigger.trigger();
    drain_workers(&mut workers).await;

    Ok(())
}

/// Wait for every worker to exit, up to [`DRAIN_TIMEOUT`]
async fn drain_workers(workers: &mut JoinSet<()>) {
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Worker task ended abnormally: {}", e);
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            "{} worker(s) still busy after {:?}, aborting",
            workers.len(),
            DRAIN_TIMEOUT
        );
        workers.abort_all();
    } else {
        info!("All workers stopped");
    }
}

/// SIGTERM / SIGINT listener
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Name of the signal received
    async fn recv(&mut self) -> Result<&'static str> {
        tokio::select! {
            _ = self.sigterm.recv() => Ok("SIGTERM"),
            _ = self.sigint.recv() => Ok("SIGINT"),
        }
    }
}

/// Fallback listener for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Result<&'static str> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok("SIGINT")
    }
}
