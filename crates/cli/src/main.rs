mod catalog_commands;
mod config_commands;
mod db_commands;
mod gateway;
mod ticket_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    helpline_config::HelplineConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "helpline", about = "Helpline: ticketing and auto-replies for messaging channels")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./helpline.toml and ~/.config/helpline/).
    #[arg(long, global = true, env = "HELPLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Custom data directory for the database and media.
    #[arg(long, global = true, env = "HELPLINE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process gateway frames (default when no subcommand is provided).
    Gateway {
        /// Read frames from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Catalog validation and loading.
    Catalog {
        #[command(subcommand)]
        action: catalog_commands::CatalogAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Database management (migrate, reset).
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
    /// Ticket inspection.
    Tickets {
        #[command(subcommand)]
        action: ticket_commands::TicketAction,
    },
}

/// Logs go to stderr: stdout carries the outbound stream.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Config from `--config` when given (errors are fatal), else discovered.
fn load_config(cli: &Cli) -> anyhow::Result<HelplineConfig> {
    match cli.config.as_deref() {
        Some(path) => Ok(helpline_config::load_config(path)?),
        None => Ok(helpline_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    if let Some(ref dir) = cli.data_dir {
        helpline_config::set_data_dir(dir.clone());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "helpline starting");

    match cli.command {
        None => gateway::run(&load_config(&cli)?, None).await,
        Some(Commands::Gateway { ref input }) => {
            gateway::run(&load_config(&cli)?, input.as_deref()).await
        },
        Some(Commands::Catalog { ref action }) => {
            catalog_commands::handle_catalog(action, &load_config(&cli)?).await
        },
        Some(Commands::Config { ref action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Some(Commands::Db { ref action }) => {
            db_commands::handle_db(action, &load_config(&cli)?).await
        },
        Some(Commands::Tickets { ref action }) => {
            ticket_commands::handle_tickets(action, &load_config(&cli)?).await
        },
    }
}
