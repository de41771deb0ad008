mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "guestwatch",
    about = "Alert staff when tasting orders are missing a guest count",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding .guestwatch/ (default: auto-detect from cwd)
    #[arg(long, global = true, env = "GUESTWATCH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .guestwatch/config.yaml
    Init {
        /// Product id to watch (repeatable)
        #[arg(long = "product", value_name = "ID")]
        products: Vec<String>,
        /// Email recipient (repeatable)
        #[arg(long = "email", value_name = "ADDRESS")]
        emails: Vec<String>,
        /// SMS recipient (repeatable)
        #[arg(long = "phone", value_name = "NUMBER")]
        phones: Vec<String>,
    },

    /// Check recent orders and alert on missing guest counts
    Run {
        /// Report what would be sent without sending or saving state
        #[arg(long)]
        dry_run: bool,

        /// Enablement switch; anything but false/0/no/off means enabled
        #[arg(long, env = "GUESTWATCH_ENABLED", value_name = "BOOL")]
        enabled: Option<String>,
    },

    /// Show the persisted run state
    State,

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Verify the Commerce7 credentials with a one-order request
    Ping,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } | Commands::Ping => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            products,
            emails,
            phones,
        } => cmd::init::run(&root, products, emails, phones),
        Commands::Run { dry_run, enabled } => {
            cmd::run::run(&root, dry_run, enabled.as_deref(), cli.json)
        }
        Commands::State => cmd::state::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Ping => cmd::ping::run(&root, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
