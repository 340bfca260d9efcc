//! Kaizen CLI: periodic research-driven review of dotfiles.

use clap::Parser;
use kaizen_cli::{commands, env, Cli, Commands};

#[tokio::main]
async fn main() {
    // Before parsing so clap's `env` attributes see .env values.
    let env_files = env::load_dotenv();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kaizen_core=info,kaizen_cli=info".into()),
        )
        .init();
    for file in &env_files {
        tracing::info!("Loaded environment from '{}'", file.display());
    }

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Validate { config } => commands::validate::run(&config),
        Commands::Plan => commands::plan::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}
