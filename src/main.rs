use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use gh_bridge::error::AppError;
use gh_bridge::state::AppState;
use gh_bridge::{api, logging, paths, settings};

#[derive(Parser)]
#[command(name = "gh-bridge", about = "HTTP bridge to a Grasshopper command socket", version)]
struct Args {
    /// Config directory (holds settings.json)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Remote host override
    #[arg(long)]
    remote_host: Option<String>,

    /// Remote port override
    #[arg(long)]
    remote_port: Option<u16>,

    /// Per-operation timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// HTTP bind host override
    #[arg(long)]
    host: Option<String>,

    /// HTTP port override (0 picks a free port)
    #[arg(long)]
    port: Option<u16>,

    /// Skip the startup connection attempt
    #[arg(long)]
    no_connect: bool,

    /// Write the effective settings back to settings.json
    #[arg(long)]
    save_settings: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn run(args: Args) -> Result<(), AppError> {
    let config_dir = args.config_dir.unwrap_or_else(paths::default_config_dir);
    let mut settings = settings::load_or_default(&config_dir);

    if let Some(host) = args.remote_host {
        settings.remote.host = host;
    }
    if let Some(port) = args.remote_port {
        settings.remote.port = port;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.remote.timeout_ms = timeout_ms;
    }
    if let Some(host) = args.host {
        settings.api.host = host;
    }
    if let Some(port) = args.port {
        settings.api.port = port;
    }

    settings.validate()?;
    if args.save_settings {
        settings::save_settings(&config_dir, &settings)?;
        tracing::info!(path = %paths::settings_path(&config_dir).display(), "settings saved");
    }

    let state = Arc::new(AppState::new(settings)?);

    if !args.no_connect {
        match state.bridge.connect().await {
            Ok(()) => tracing::info!(remote = %state.remote_address(), "remote connected"),
            Err(e) => tracing::warn!(error = %e, "remote not reachable yet, will retry on first command"),
        }
    }

    let addr = api::start_api_server(Arc::clone(&state)).await?;
    tracing::info!("serving on http://{addr}");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose) {
        eprintln!("[gh-bridge] {e}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gh-bridge failed");
            ExitCode::FAILURE
        }
    }
}
