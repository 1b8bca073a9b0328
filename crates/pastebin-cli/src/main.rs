//! Pastebin CLI
//!
//! Command-line interface for sharing text pastes.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pastebin_core::Config;

mod app;
mod commands;
mod editor;
mod output;

use app::App;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "paste")]
#[command(about = "Pastebin - share text snippets")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (overrides PASTEBIN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new paste
    #[command(alias = "add")]
    New {
        /// Paste title (prompted if not provided)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Paste content (read from stdin or the editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
    },
    /// List all pastes
    #[command(alias = "ls")]
    List {
        /// Only titles containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List your own pastes
    Mine {
        /// Only titles containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show a paste
    Show {
        /// Paste ID (full or prefix)
        id: String,
    },
    /// Edit one of your pastes
    Edit {
        /// Paste ID (full or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete one of your pastes
    #[command(alias = "rm")]
    Delete {
        /// Paste ID (full or prefix)
        id: String,
    },
    /// Print the share link of a paste
    Share {
        /// Paste ID (full or prefix)
        id: String,
    },
    /// Create an account
    Register {
        email: String,
        /// Read the password from stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign in
    Login {
        email: String,
        /// Read the password from stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Import a legacy local-storage export as your pastes
    Import {
        /// JSON file holding the exported pastes
        file: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backend, firebase_api_key, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the client
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config = Config::load_with_cli_override(config_path)?;
    init_logging(&config);

    let mut app = App::open(config).await?;
    let result = run(cli.command, &mut app, &output).await;
    app.shutdown(&output);

    match result {
        // Already shown as a notice
        Err(e) if app::already_reported(&e) => {
            info!("Command failed: {:#}", e);
            std::process::exit(1);
        }
        other => other,
    }
}

async fn run(command: Commands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        Commands::New { title, content } => {
            commands::paste::create(app, title, content, output).await
        }
        Commands::List { search } => commands::paste::list(app, search, output).await,
        Commands::Mine { search } => commands::paste::mine(app, search, output).await,
        Commands::Show { id } => commands::paste::show(app, id, output).await,
        Commands::Edit { id, title, content } => {
            commands::paste::edit(app, id, title, content, output).await
        }
        Commands::Delete { id } => commands::paste::delete(app, id, output).await,
        Commands::Share { id } => commands::paste::share(app, id, output).await,
        Commands::Register {
            email,
            password_stdin,
        } => commands::auth::register(app, email, password_stdin, output).await,
        Commands::Login {
            email,
            password_stdin,
        } => commands::auth::login(app, email, password_stdin, output).await,
        Commands::Logout => commands::auth::logout(app, output).await,
        Commands::Whoami => commands::auth::whoami(app, output),
        Commands::Import { file } => commands::paste::import(app, file, output).await,
        Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Log to a file when PASTEBIN_LOG is set
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("PASTEBIN_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::options().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("pastebin_core={},paste={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
