use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tunecue::api::{self, ApiState};
use tunecue::orchestrator::CommandOrchestrator;
use tunecue::session::Session;
use tunecue::{paths, settings};

#[derive(Parser)]
#[command(name = "tunecue", about = "Natural-language playback command server")]
struct Args {
    /// Config directory (defaults to the OS config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Listen address, overriding `server.listen_addr` from settings
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tunecue=info")))
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    let config_dir = args.config_dir.unwrap_or_else(paths::default_config_dir);
    let settings = settings::load_effective_settings(&config_dir);

    let addr = match args.listen {
        Some(addr) => addr,
        None => settings
            .server
            .listen_addr
            .parse()
            .map_err(|e| format!("Invalid listen address {:?}: {e}", settings.server.listen_addr))?,
    };

    let orchestrator = CommandOrchestrator::from_settings(&settings).with_audit_dir(config_dir.clone());
    let session = Session::from_env();
    if !session.is_authenticated() {
        info!("no startup access token; waiting for PUT /api/session or per-request bearer tokens");
    }

    let state = Arc::new(ApiState::new(orchestrator, session));
    let bound = api::start_api_server(state, addr).await?;
    info!(config_dir = %config_dir.display(), "listening on http://{bound}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;
    info!("shutting down");
    Ok(())
}
