//! Jellycord - Emby/Jellyfin activity mirrored into Discord
//!
//! Main entry point for the Jellycord bot.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jellycord::bot::Bot;
use jellycord::cli::Cli;
use jellycord::config::Config;
use jellycord::error::JellycordError;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("jellycord.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration; invalid config aborts before anything runs
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(exit_code_for(&e));
    }

    tracing::info!(
        "Starting Jellycord ({} -> guild {})",
        config.media_server.kind,
        config.discord.server_id
    );

    let bot = Bot::new(config, cli.dry_run)?;
    if let Err(e) = bot.run().await {
        tracing::error!("Error starting bot: {}", e);
        std::process::exit(exit_code_for(&e));
    }

    Ok(())
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<JellycordError>()
        .map(JellycordError::exit_code)
        .unwrap_or(1)
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "jellycord=debug"
    } else {
        "jellycord=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
