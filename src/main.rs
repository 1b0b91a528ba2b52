use anyhow::Context;
use clap::Parser;
use sentinel::adapters::{
    DingTalkNotifier, ListenerTable, ProcessProbe, ScriptCleaner, SystemProbe,
};
use sentinel::cli::{Cli, Commands};
use sentinel::config::AppConfig;
use sentinel::error::{Result, SentinelError};
use sentinel::identity::HostIdentity;
use sentinel::registry::ServiceRegistry;
use sentinel::supervisor::{DetachedLauncher, ErrorRateDetector, Supervisor};
use std::path::Path;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Status) => {
            init_logging_simple();
            run_status(&cli)?;
        }
        Some(Commands::Check) => {
            init_logging_simple();
            run_check(&cli)?;
        }
        Some(Commands::Run) | None => {
            run_supervisor(&cli).await?;
        }
    }

    Ok(())
}

/// Supervision mode: probe, relaunch, alert and sweep until shutdown.
async fn run_supervisor(cli: &Cli) -> Result<()> {
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config.logging.level);

    info!("Starting service supervisor");

    if let Err(errors) = config.validate() {
        for msg in &errors {
            error!("Config validation: {}", msg);
        }
        return Err(SentinelError::InvalidConfig(errors.join("; ")));
    }

    let registry = build_registry(&config)?;
    info!(services = registry.len(), "services assigned to this host");

    let sink = if config.webhook.enabled() {
        Some(DingTalkNotifier::new(
            config.webhook.url.clone(),
            Duration::from_secs(config.webhook.timeout_secs),
        )?)
    } else {
        warn!("webhook url not configured; alerts will only be logged");
        None
    };

    let launcher = DetachedLauncher::new(ListenerTable::new(), &config.launch);
    let supervisor = Supervisor::new(
        &config,
        registry,
        SystemProbe::new(),
        launcher,
        sink,
        ScriptCleaner::new(config.paths.cleanup_script.clone()),
    );

    let loop_handle = tokio::spawn(supervisor.run());

    tokio::select! {
        result = loop_handle => {
            match result {
                Ok(Ok(())) => info!("Supervisor loop finished"),
                Ok(Err(e)) => {
                    error!("Supervisor terminated: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    return Err(SentinelError::Internal(format!(
                        "supervisor task panicked: {e}"
                    )));
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Supervisor stopped");
    Ok(())
}

/// One-shot liveness table for this host's services.
fn run_status(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_from(&cli.config).context("Failed to load configuration")?;
    let registry = build_registry(&config).context("Failed to build service registry")?;
    let probe = SystemProbe::new();

    println!("\n{}", "=".repeat(60));
    println!("  SERVICE STATUS");
    println!("{}\n", "=".repeat(60));

    if registry.is_empty() {
        println!("  No service is assigned to this host");
    } else {
        println!("  {:<20} {:<22} {:<12} {}", "NAME", "ADDR", "STATUS", "PID");
        println!("  {}", "-".repeat(55));

        for svc in registry.iter() {
            let pid = probe.find_pid(&svc.name, &svc.ip);
            if pid != 0 {
                println!(
                    "  {:<20} {:<22} \x1b[32m{:<12}\x1b[0m {}",
                    svc.name,
                    svc.addr(),
                    "● running",
                    pid
                );
            } else {
                println!(
                    "  {:<20} {:<22} \x1b[90m{:<12}\x1b[0m {}",
                    svc.name,
                    svc.addr(),
                    "○ down",
                    "-"
                );
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

/// One-shot error-log window scan for this host's services.
fn run_check(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_from(&cli.config).context("Failed to load configuration")?;
    let registry = build_registry(&config).context("Failed to build service registry")?;
    let detector =
        ErrorRateDetector::new(config.monitor.window_secs, config.monitor.alert_threshold);
    let now = chrono::Local::now().timestamp();

    println!("\n{}", "=".repeat(60));
    println!("  ERROR LOG CHECK (last {}s)", config.monitor.window_secs);
    println!("{}\n", "=".repeat(60));

    for svc in registry.iter() {
        let window = detector.scan(&svc.error_log_path(), now);
        if window.peak >= config.monitor.alert_threshold {
            println!(
                "  {:<20} \x1b[31mpeak {:>4}/sec\x1b[0m  {}",
                svc.name,
                window.peak,
                svc.error_log_path().display()
            );
        } else {
            println!(
                "  {:<20} \x1b[32mpeak {:>4}/sec\x1b[0m  {}",
                svc.name,
                window.peak,
                svc.error_log_path().display()
            );
        }
        for line in window.samples.lines() {
            println!("      {}", line);
        }
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

/// Detect this host's identity and select its services from the shared
/// descriptor file.
fn build_registry(config: &AppConfig) -> Result<ServiceRegistry> {
    let identity = HostIdentity::detect(&config.paths)?;
    info!(
        ip = %identity.ip,
        host = %identity.host_name,
        semver = %identity.semver,
        "local identity detected"
    );
    let entries = ServiceRegistry::load_entries(Path::new(&config.paths.servers_file))?;
    Ok(ServiceRegistry::build(
        entries,
        &identity,
        &config.paths.log_dir_prefix,
    ))
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},sentinel=debug")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn init_logging_simple() {
    // Minimal logging for CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
