mod analyze;
mod report;

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use fanpulse_analytics::{PgRecordStore, RecordStore};
use fanpulse_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fanpulse-cli")]
#[command(about = "FanPulse command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Resolve the sentiment of a piece of text without storing it
    Analyze {
        /// Text to analyse
        text: String,
    },
    /// Attribute, analyse and store one comment
    Ingest {
        /// Platform-assigned id of the comment
        #[arg(long)]
        source_id: String,

        /// Source platform (reddit, youtube, twitter, instagram)
        #[arg(long, default_value = "reddit")]
        platform: String,

        /// Team slug; skips keyword attribution
        #[arg(long)]
        team: Option<String>,

        #[arg(long)]
        author: Option<String>,

        /// Comment text
        text: String,
    },
    /// List stored comments, newest first
    Comments {
        /// Team slug
        #[arg(long)]
        team: Option<String>,

        #[arg(long)]
        platform: Option<String>,

        /// POSITIVE, NEGATIVE or NEUTRAL
        #[arg(long)]
        label: Option<String>,

        /// Case-insensitive author substring
        #[arg(long)]
        author: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size, at most 100
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show per-team sentiment trends
    Trends {
        /// 7d, 30d or 90d
        #[arg(long, default_value = "7d")]
        period: String,

        /// Restrict output to one team (by slug)
        #[arg(long)]
        team: Option<String>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show ranked insights for a period
    Insights {
        /// 7d, 30d or 90d
        #[arg(long, default_value = "7d")]
        period: String,

        /// Print insights as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show label breakdown and confidence bands
    Stats,
    /// Remove duplicate verdicts, keeping the oldest per comment
    Cleanup {
        /// Report duplicates without deleting them
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("fanpulse-cli: run with --help to list commands");
        return Ok(());
    };

    let config = fanpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(environment = %config.env, "configuration loaded");

    match command {
        Commands::Db { command } => run_db(&config, command).await,
        Commands::Analyze { text } => analyze::run_analyze(&config, &text).await,
        Commands::Ingest {
            source_id,
            platform,
            team,
            author,
            text,
        } => {
            let store = open_store(&config).await?;
            let input = analyze::IngestInput {
                source_id,
                platform,
                team,
                author,
                text,
            };
            analyze::run_ingest(&config, store, input).await
        }
        Commands::Comments {
            team,
            platform,
            label,
            author,
            page,
            limit,
            json,
        } => {
            let filter = report::CommentFilter {
                team,
                platform,
                label,
                author,
                page,
                limit,
            };
            report::run_comments(open_store(&config).await?, &filter, json).await
        }
        Commands::Trends { period, team, json } => {
            let store = open_store(&config).await?;
            report::run_trends(&config, store, &period, team.as_deref(), json).await
        }
        Commands::Insights { period, json } => {
            let store = open_store(&config).await?;
            report::run_insights(&config, store, &period, json).await
        }
        Commands::Stats => report::run_stats(open_store(&config).await?).await,
        Commands::Cleanup { dry_run } => {
            report::run_cleanup(open_store(&config).await?, dry_run).await
        }
    }
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Migrate => {
            let applied = fanpulse_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("migrations complete: {applied} applied");
        }
        DbCommands::Ping => {
            if let Err(e) = fanpulse_db::ping(&pool).await {
                tracing::error!(error = %e, "database ping failed");
                return Err(e.into());
            }
            println!("database ok");
        }
    }
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = fanpulse_db::PoolConfig::from_app_config(config);
    let pool = fanpulse_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    let pool = connect(config).await?;
    Ok(Arc::new(PgRecordStore::new(
        pool,
        Duration::from_secs(config.store_timeout_secs),
    )))
}
