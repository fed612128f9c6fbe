use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use tvloop::{
    config::Config,
    database::Database,
    observability::init_logging,
    services::{LockOutcome, ProgramHousekeeper, ProgramScheduler},
    utils::SystemClock,
};

#[derive(Parser)]
#[command(name = "tvloop")]
#[command(version)]
#[command(about = "24/7 virtual channel program scheduler")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the maintenance loop until interrupted (default)
    Run,
    /// Regenerate the future timeline of one or all channels
    Generate {
        /// Only this channel
        #[arg(long, value_name = "ID")]
        channel: Option<Uuid>,
        /// Window length in hours (defaults to the guide horizon)
        #[arg(long, value_name = "N", conflicts_with = "burst")]
        hours: Option<u32>,
        /// Use the short "content added" window
        #[arg(long, requires = "channel")]
        burst: bool,
    },
    /// Run one maintenance pass over every channel
    Maintain,
    /// Delete programs past the retention period
    Cleanup,
    /// Resolve overlapping programs on every channel
    FixOverlaps,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    info!("Starting tvloop v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let scheduler = Arc::new(ProgramScheduler::from_database(
        &database,
        &config,
        Arc::new(SystemClock),
    )?);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(scheduler, &config).await?,
        Command::Generate {
            channel: Some(channel_id),
            hours,
            burst,
        } => {
            let outcome = if burst {
                scheduler.generate_content_burst(channel_id).await?
            } else {
                scheduler.generate_for_channel(channel_id, hours).await?
            };
            match outcome {
                LockOutcome::Ran(outcome) => {
                    info!(
                        "Generated {} programs for channel {} ({} removed, truncated: {})",
                        outcome.inserted, channel_id, outcome.deleted, outcome.truncated
                    );
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                LockOutcome::Joined => info!("Channel {} was already being generated", channel_id),
            }
        }
        Command::Generate {
            channel: None,
            hours,
            ..
        } => {
            let report = scheduler.generate_for_all_channels(hours).await?;
            for failure in &report.failed {
                error!("Channel {} failed: {}", failure.channel_id, failure.error);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Maintain => {
            let report = scheduler.maintain_programs().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Cleanup => {
            let removed = scheduler.cleanup_old_programs().await?;
            info!("Removed {} expired programs", removed);
        }
        Command::FixOverlaps => {
            let changed = scheduler.cleanup_all_overlaps().await?;
            info!("Changed {} overlapping programs", changed);
        }
    }

    Ok(())
}

async fn run(scheduler: Arc<ProgramScheduler>, config: &Config) -> Result<()> {
    let housekeeper = ProgramHousekeeper::from_config(scheduler, &config.maintenance)?;
    let cancellation_token = CancellationToken::new();

    let shutdown = cancellation_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    housekeeper.run(cancellation_token).await;
    info!("tvloop stopped");
    Ok(())
}
