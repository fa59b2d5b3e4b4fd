use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod core;
mod error;
mod server;
mod services;
mod signal_handler;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;
use error::Result;
use server::AppState;
use services::SimpleServices;

#[derive(Parser)]
#[command(name = "song-catalog")]
#[command(about = "HTTP service for a song library with paginated lyrics")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init_logging(cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;
    let services = SimpleServices::new(config);
    let config = services.config();

    let store = services.create_store().await?;
    let service = match services.create_song_service(store.clone()).await {
        Ok(service) => Arc::new(service),
        Err(e) => {
            store.close().await;
            return Err(e);
        }
    };

    let state = AppState::new(service.clone(), config.api_base_url()?);
    let served = server::serve(state, config.server_addr()?, signal_handler::shutdown_signal()).await;
    if let Err(e) = &served {
        error!("Server working error - {}", e);
    }

    if let Err(e) = service.close().await {
        error!("Failed to close cache: {}", e);
    }
    store.close().await;
    info!("Shutdown complete");

    served
}
