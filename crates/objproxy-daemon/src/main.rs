//! objproxy - storage access proxy daemon

use anyhow::{Context, Result};
use clap::Parser;
use objproxy_config::Config;
use objproxy_daemon::{logging, spawn_signal_listener, Daemon, LogHandle};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "objproxy")]
#[command(about = "objproxy - serve stored objects over a local socket")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to /etc/objproxy/objproxy.toml when present)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Object socket path (overrides config file and environment)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Monitoring listener port on localhost
    #[arg(long)]
    stat_port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("failed to load configuration")?;
        if let Some(socket) = &self.socket {
            config.daemon.socket_path = socket.clone();
        }
        if let Some(port) = self.stat_port {
            config.daemon.stat_port = port;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("objproxy: {:#}", e);
            process::exit(1);
        }
    };

    let log = match logging::init(&config.daemon, cli.verbose) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("objproxy: failed to initialize logging: {:#}", e);
            process::exit(1);
        }
    };

    info!("Starting objproxy v{}", env!("CARGO_PKG_VERSION"));

    match run(&config, log).await {
        Ok(()) => {
            info!("objproxy exited cleanly");
            process::exit(0);
        }
        Err(e) => {
            error!("objproxy failed: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(config: &Config, log: LogHandle) -> Result<()> {
    let daemon = Daemon::from_config(config).await?.with_log_handle(log);
    let _signals =
        spawn_signal_listener(daemon.event_sender()).context("failed to install signal handlers")?;
    daemon.run().await
}
