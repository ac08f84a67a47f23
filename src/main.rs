use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod core;
mod logging;
mod server;
pub mod ui;

use commands::{config, search, serve, status};

#[derive(Parser)]
#[command(name = "feic-bridge")]
#[command(about = "Find Element In Code - locate rendered elements in your source tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Search pattern (if no command specified)
    #[arg(value_name = "REGEX")]
    pattern: Option<String>,

    /// Verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lookup server for a workspace
    #[command(alias = "s")]
    Serve {
        /// Workspace root (defaults to current directory)
        path: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, env = "FEIC_PORT")]
        port: Option<u16>,

        /// Start immediately instead of resuming the last known state
        #[arg(long)]
        start: bool,
    },

    /// Find the first match of a regex in the workspace
    #[command(alias = "f")]
    Search {
        /// Regular expression to look for
        pattern: String,

        /// Workspace root (defaults to current directory)
        path: Option<String>,

        /// File extension to scan (e.g. tsx, html); repeatable
        #[arg(short = 't', long = "type", value_name = "EXT")]
        file_types: Vec<String>,
    },

    /// Show the persisted server state for a workspace
    #[command(alias = "st")]
    Status {
        /// Workspace root (defaults to current directory)
        path: Option<String>,
    },

    /// Configure feic-bridge settings
    #[command(alias = "c")]
    Config {
        /// Set the listening port
        #[arg(long)]
        port: Option<u16>,

        /// Directory name to skip while scanning; repeatable, replaces the list
        #[arg(long = "ignore", value_name = "DIR")]
        ignore_dirs: Vec<String>,

        /// Default file extension for CLI searches; repeatable, replaces the list
        #[arg(long = "file-type", value_name = "EXT")]
        file_types: Vec<String>,

        /// Per-request search deadline in milliseconds (0 disables)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Skip files matched by .gitignore
        #[arg(long)]
        respect_gitignore: Option<bool>,

        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Restore default configuration
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Some(Commands::Serve { path, port, start }) => {
            serve::run(serve::ServeOptions { path, port, start }).await?;
        }
        Some(Commands::Search {
            pattern,
            path,
            file_types,
        }) => {
            search::run(search::SearchOptions {
                pattern,
                path,
                file_types: if file_types.is_empty() {
                    None
                } else {
                    Some(file_types)
                },
            })
            .await?;
        }
        Some(Commands::Status { path }) => {
            status::run(status::StatusOptions { path }).await?;
        }
        Some(Commands::Config {
            port,
            ignore_dirs,
            file_types,
            timeout_ms,
            respect_gitignore,
            show,
            reset,
        }) => {
            config::run(config::ConfigOptions {
                port,
                ignore_dirs,
                file_types,
                timeout_ms,
                respect_gitignore,
                show,
                reset,
            })
            .await?;
        }
        None => {
            if let Some(pattern) = cli.pattern {
                search::run(search::SearchOptions {
                    pattern,
                    path: None,
                    file_types: None,
                })
                .await?;
            } else {
                // Show help
                use clap::CommandFactory;
                Cli::command().print_help()?;
            }
        }
    }

    Ok(())
}
