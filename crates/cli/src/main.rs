//! Ragline CLI, the main entry point.
//!
//! Commands:
//! - `onboard` creates `~/.ragline/config.toml` and a sample corpus
//! - `config`  validates, prints, or locates the config file
//! - `chat`    asks one question, or chats interactively, against the corpus
//! - `doctor`  checks that everything `chat` needs is in place

use clap::{Parser, Subcommand};

mod commands;

use commands::chat::{ChatOptions, ModeArg};

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Ragline: grounded chat answers over your own documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and a sample corpus
    Onboard,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Ask questions grounded in the configured corpus
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Retrieval mode
        #[arg(long, value_enum, default_value_t = ModeArg::Hybrid)]
        mode: ModeArg,

        /// Number of documents to ground on
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..))]
        top: u16,

        /// Suggest three follow-up questions after each answer
        #[arg(long)]
        followups: bool,

        /// Leave out documents of this category
        #[arg(long)]
        exclude_category: Option<String>,

        /// Override the answer temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,

        /// Print a telemetry summary on exit
        #[arg(long)]
        stats: bool,
    },

    /// Diagnose configuration and corpus
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the config file
    Validate,
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
        Commands::Chat {
            message,
            mode,
            top,
            followups,
            exclude_category,
            temperature,
            json,
            stats,
        } => {
            let options = ChatOptions {
                message,
                mode: mode.into(),
                top: usize::from(top),
                followups,
                exclude_category,
                temperature,
                json,
                stats,
            };
            commands::chat::run(options).await?
        }
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
