//! objproxy-cat - fetch one object from the objproxy daemon to stdout

use anyhow::{Context, Result};
use clap::Parser;
use objproxy_client::ObjectClient;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "objproxy-cat")]
#[command(about = "Fetch an object through the objproxy daemon")]
#[command(version)]
struct Cli {
    /// Daemon socket path (defaults to $OBJPROXY_SOCKET or the runtime dir)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Object name
    name: String,
}

async fn run(cli: Cli) -> Result<()> {
    let client = match &cli.socket {
        Some(path) => ObjectClient::connect_to(path),
        None => ObjectClient::new(),
    };
    let mut stdout = tokio::io::stdout();
    client
        .cat(&cli.name, &mut stdout)
        .await
        .with_context(|| format!("failed to fetch {}", cli.name))?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("objproxy-cat: {:#}", e);
        process::exit(1);
    }
}
