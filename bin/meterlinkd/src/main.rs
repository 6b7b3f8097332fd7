//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "binary"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Binary entrypoint for the Meterlink daemon."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use meterlink_common::{init_tracing, AppConfig};
use meterlink_core::{
    ChannelPresenter, Credential, EmissionScheduler, EmissionSettings, FileSessionStorage,
    SessionGate, SessionStorage,
};
use meterlink_metrics::{new_registry, spawn_http_server, EmitterMetrics};
use meterlink_net::HttpCollectorClient;
use tokio::signal;
use tokio::time::timeout;
use tracing::{info, warn};

mod console;

use console::RenderExit;

const RENDER_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("Meterlink ", env!("CARGO_PKG_VERSION")),
    about = "Meterlink telemetry emitter",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Emit readings until interrupted")]
    Run,
    #[command(about = "Verify a bearer token with the collector and store it")]
    Login {
        #[arg(long, help = "Token to store; read from the configured environment variable when omitted")]
        token: Option<String>,
    },
    #[command(about = "Forget the stored token")]
    Logout,
    #[command(about = "Report whether a token is stored")]
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/meterlink.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    init_tracing("meterlinkd", &config.logging)?;
    info!(source = %loaded.source.display(), "configuration loaded");

    let storage = Arc::new(FileSessionStorage::new(&config.session.token_path));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, storage).await?,
        Commands::Login { token } => login(&config, storage.as_ref(), token).await?,
        Commands::Logout => {
            storage.clear()?;
            println!("Logged out");
        }
        Commands::Status => {
            let gate = SessionGate::new(storage.clone());
            println!(
                "Authenticated: {}\nToken file: {}",
                gate.is_authenticated(),
                storage.path().display()
            );
        }
    }

    Ok(())
}

async fn login(
    config: &AppConfig,
    storage: &FileSessionStorage,
    token: Option<String>,
) -> Result<()> {
    let raw = match token {
        Some(token) => token,
        None => std::env::var(&config.session.token_env).with_context(|| {
            format!("no --token given and {} is not set", config.session.token_env)
        })?,
    };
    let credential = Credential::new(raw).ok_or_else(|| anyhow!("token must not be blank"))?;

    let client = HttpCollectorClient::from_config(&config.collector)?;
    client
        .verify(&credential)
        .await
        .context("collector did not accept the token")?;
    storage.set(credential)?;
    info!(path = %storage.path().display(), "session token stored");
    println!("Logged in");
    Ok(())
}

async fn run_daemon(config: AppConfig, storage: Arc<FileSessionStorage>) -> Result<()> {
    let metrics_settings = config.metrics.clone();
    let (metrics, metrics_server) = if metrics_settings.enabled {
        let registry = new_registry();
        let metrics = EmitterMetrics::new(registry.clone())?;
        let server = spawn_http_server(registry, metrics_settings.listen).await?;
        info!(address = %server.addr(), "metrics exporter enabled");
        (Some(metrics), Some(server))
    } else {
        info!("metrics exporter disabled by configuration");
        (None, None)
    };

    let gate = SessionGate::new(storage);
    if !gate.is_authenticated() {
        warn!("no session token stored; emission will halt on the first tick until `login` succeeds");
    }

    let client = Arc::new(HttpCollectorClient::from_config(&config.collector)?);
    let (presenter, events) = ChannelPresenter::new();
    let mut renderer = tokio::spawn(console::render(events));

    let scheduler = EmissionScheduler::new(
        EmissionSettings::from_config(&config.emission),
        gate,
        client,
        Arc::new(presenter),
        metrics,
    );
    scheduler.start();

    info!("emitter running; waiting for termination signal");
    let halted = tokio::select! {
        signal = signal::ctrl_c() => {
            signal?;
            info!("ctrl-c received; shutting down");
            None
        }
        exit = &mut renderer => Some(exit.context("console renderer failed")?),
    };
    scheduler.stop();
    info!(stats = ?scheduler.stats(), "emission summary");
    drop(scheduler);
    if halted.is_none() && timeout(RENDER_DRAIN, renderer).await.is_err() {
        warn!("console output still pending at exit");
    }

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }

    match halted {
        None => Ok(()),
        Some(RenderExit::SessionExpired) => Err(anyhow!(
            "collector rejected the session token; run `meterlinkd login` and start again"
        )),
        Some(_) => Err(anyhow!(
            "emission halted without a usable session token; run `meterlinkd login` and start again"
        )),
    }
}
