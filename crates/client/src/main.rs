// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection doctor: connect to a node, complete the handshake, round-trip
//! one `Ping`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::error;
use uuid::Uuid;

use evstore::{Client, Cmd, Credentials, EndPoint, Package, Settings};

#[derive(Debug, Parser)]
#[command(name = "evstore", about = "Ping an EventStore node over the TCP protocol")]
struct Args {
    /// Node host.
    #[arg(long, default_value = "127.0.0.1", env = "EVSTORE_HOST")]
    host: String,

    /// Node TCP port.
    #[arg(long, default_value_t = 1113, env = "EVSTORE_PORT")]
    port: u16,

    /// Username for the authentication handshake.
    #[arg(long, env = "EVSTORE_USER")]
    user: Option<String>,

    /// Password for the authentication handshake.
    #[arg(long, env = "EVSTORE_PASS")]
    pass: Option<String>,

    /// Connection name reported during identification.
    #[arg(long, env = "EVSTORE_NAME")]
    name: Option<String>,

    /// JSON settings file; flags override its values.
    #[arg(long, env = "EVSTORE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Give up after this many milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(args).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = match &args.settings {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Settings>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => Settings::default(),
    };
    settings.seeds = vec![EndPoint::new(args.host, args.port)];
    if let (Some(user), Some(pass)) = (args.user, args.pass) {
        settings.default_user_credentials = Some(Credentials::new(user, pass));
    }
    if let Some(name) = args.name {
        settings.default_connection_name = Some(name);
    }

    let mut client = Client::spawn(settings);
    let correlation = Uuid::new_v4();
    let sent_at = Instant::now();
    client
        .submit(Package::new(Cmd::PING, correlation))
        .await
        .context("submitting ping")?;

    let reply = tokio::time::timeout(Duration::from_millis(args.timeout_ms), async {
        loop {
            match client.recv().await {
                Some(Ok(pkg)) if pkg.correlation == correlation => return Ok(pkg),
                Some(Ok(_)) => continue,
                Some(Err(bad)) => anyhow::bail!("ping failed: {bad}"),
                None => anyhow::bail!("driver stopped before the ping completed"),
            }
        }
    })
    .await
    .context("timed out waiting for pong")??;

    anyhow::ensure!(reply.cmd == Cmd::PONG, "unexpected reply command {}", reply.cmd);
    println!("PONG in {:?}", sent_at.elapsed());

    client.shutdown().await;
    Ok(())
}
