//! polylsp command-line driver

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polylsp::app::App;
use polylsp::cli::{Cli, Commands};

fn main() {
    // Logs go to stderr; stdout carries only JSON
    // Use RUST_LOG=polylsp=debug for protocol-level output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polylsp=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            println!(
                "{}",
                polylsp::cli::output::error_value(&format!("Failed to create runtime: {e}"))
            );
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(async_main());

    if let Err(e) = result {
        let response = polylsp::cli::output::error_value(&e.to_string());
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string())
        );
        std::process::exit(2);
    }
}

async fn async_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = App::new(cli.root)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize: {}", e))?;

    execute_command(cli.command, &app).await
}

async fn execute_command(command: Commands, app: &App) -> anyhow::Result<()> {
    use polylsp::cli::commands;

    match command {
        Commands::Symbols(args) => commands::symbols::execute(args, app).await,
        Commands::Refs(args) => commands::refs::execute(args, app).await,
        Commands::Hierarchy(args) => commands::hierarchy::execute(args, app).await,
        Commands::Doctor(args) => commands::doctor::execute(args, app),
    }
}
