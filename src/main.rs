//! Kontext CLI entry point.

use anyhow::Result;
use clap::Parser;
use kontext::cli::{commands, Cli, Commands};
use kontext::config::Settings;
use kontext::orchestrator::Orchestrator;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref().map(PathBuf::from);

    // Load configuration
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging; -v flags override the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("kontext={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // These run without opening the store.
    match &cli.command {
        Commands::Config { action } => return commands::run_config(action, config_path, &settings),
        Commands::Doctor => return commands::run_doctor(config_path, &settings).await,
        _ => {}
    }

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.initialize().await?;

    // Execute command
    let result = match cli.command {
        Commands::Index { dir, reset } => commands::run_index(dir, reset, &orchestrator).await,

        Commands::Add { file } => commands::run_add(&file, &orchestrator).await,

        Commands::Search {
            query,
            limit,
            min_score,
            keyword,
        } => commands::run_search(&query, limit, min_score, keyword, &orchestrator).await,

        Commands::Ask { question, model } => {
            commands::run_ask(&question, model, &orchestrator).await
        }

        Commands::Stats => commands::run_stats(&orchestrator).await,

        Commands::List => commands::run_list(&orchestrator).await,

        Commands::Delete { document } => commands::run_delete(&document, &orchestrator).await,

        Commands::Reset { yes } => commands::run_reset(yes, &orchestrator).await,

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| orchestrator.settings().server.host.clone());
            let port = port.unwrap_or(orchestrator.settings().server.port);
            // The server closes the store on shutdown.
            return commands::run_serve(&host, port, orchestrator).await;
        }

        Commands::Config { .. } | Commands::Doctor => Ok(()),
    };

    orchestrator.close().await?;
    result
}
