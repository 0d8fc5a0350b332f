// Mibu personal assistant backend
// Main entry point for the mibu binary

use clap::Parser;
use mibu_engine::cli::{Cli, Command};
use mibu_engine::config::Config;
use mibu_engine::handlers::{
    handle_availability, handle_briefing, handle_list, handle_plan, handle_seed, handle_serve,
    handle_travel, handle_usage, OutputFormat,
};
use mibu_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!(
        "Mibu v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port).await,

        Command::Plan {
            text,
            execute,
            force,
        } => {
            tracing::debug!("Planning: {}", text);
            handle_plan(text, execute, force, &config, format).await
        }

        Command::Travel { from, to, mode } => handle_travel(from, to, mode, &config, format).await,

        Command::Usage => handle_usage(&config, format).await,

        Command::Availability { user_ids, date } => {
            handle_availability(user_ids, date, &config, format).await
        }

        Command::Briefing { user } => handle_briefing(user, &config, format).await,

        Command::Seed => handle_seed(&config, format).await,

        Command::List { category } => handle_list(category, &config, format).await,
    }
}
