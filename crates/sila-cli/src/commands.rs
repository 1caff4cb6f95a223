use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use sila_server::{SilaConfig, SilaServer};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigArgs, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args, cli.verbose),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SilaConfig> {
    SilaConfig::load(path).context("failed to load configuration")
}

/// `RUST_LOG` wins; otherwise the configured level, or `debug` with `--verbose`.
fn init_tracing(config: &SilaConfig, verbose: bool) {
    let default = if verbose { "debug" } else { config.log.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_serve(args: ServeArgs, verbose: bool) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    init_tracing(&config, verbose);

    let server = SilaServer::open(config).context("failed to start server")?;
    println!(
        "{} Sila server on {} (store: {}/{})",
        "✓".green().bold(),
        server.config().server.bind_addr.to_string().bold(),
        server.config().store.connection_string.cyan(),
        server.config().store.database.yellow(),
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(server.serve_with_shutdown(shutdown_signal()))?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    if let Err(e) = config.validate() {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}
