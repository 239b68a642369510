//! Verifix CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use verifix::cli::{Cli, Commands};
use verifix::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise fall back to the configured level.
    let fallback_level = ConfigLoader::load()
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Run(args) => verifix::cli::commands::run::execute(args, cli.json).await,
        Commands::Init(args) => verifix::cli::commands::init::execute(args, cli.json).await,
        Commands::Trace(args) => verifix::cli::commands::trace::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        verifix::cli::handle_error(&err, cli.json);
    }
}
