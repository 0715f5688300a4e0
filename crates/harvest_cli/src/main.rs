use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use harvest_core::{Config, ContentQuery, ContentStorage, ContentType, StorageKind};
use harvest_scrapers::{build_extractors, init_logging, HttpFetcher, Logger, Pipeline, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod duration;
mod export;
mod schedule;

use duration::HumanDuration;
use schedule::Schedule;

const DEFAULT_CONFIG_FILE: &str = "harvest.toml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Harvests AI research and news into a local content store", long_about = None)]
pub struct Cli {
    /// TOML configuration file (defaults to ./harvest.toml when present)
    #[arg(long, short, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,
    /// Storage backend, overrides the config file
    #[arg(long, env = "HARVEST_STORAGE")]
    storage: Option<StorageArg>,
    /// SQLite database path, overrides the config file
    #[arg(long, env = "HARVEST_DB")]
    db: Option<PathBuf>,
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "HARVEST_LOG")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StorageArg {
    Memory,
    Sqlite,
}

impl From<StorageArg> for StorageKind {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Memory => StorageKind::Memory,
            StorageArg::Sqlite => StorageKind::Sqlite,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Harvest every configured source now, then keep going on a schedule
    Run {
        /// Run a single time and exit
        #[arg(long)]
        once: bool,
        /// Repeat with this interval (e.g. 1h, 30m, 1h15m)
        #[arg(long, conflicts_with = "at")]
        every: Option<HumanDuration>,
        /// Run daily at this local time (HH:MM), defaults to the configured time
        #[arg(long, value_parser = schedule::parse_time_of_day)]
        at: Option<NaiveTime>,
    },
    /// Print stored records, newest first
    Query {
        /// Only this content type (research, product, news, blog, analysis, general)
        #[arg(long = "type")]
        content_type: Option<ContentType>,
        /// Only records carrying this exact tag
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value_t = harvest_core::types::DEFAULT_QUERY_LIMIT)]
        limit: usize,
        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Write stored records as Markdown blog posts
    Export {
        #[arg(long, default_value = "blog_posts")]
        out: PathBuf,
        #[arg(long, default_value_t = export::DEFAULT_EXPORT_LIMIT)]
        limit: usize,
    },
    /// List the configured sources
    Sources,
    /// Serve the read-only JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Config::load(Path::new(DEFAULT_CONFIG_FILE))?,
        None => Config::default(),
    };
    if let Some(storage) = cli.storage {
        config.storage.backend = storage.into();
    }
    if let Some(db) = &cli.db {
        config.storage.path = db.clone();
    }
    Ok(config)
}

async fn open_storage(config: &Config) -> Result<Arc<dyn ContentStorage>> {
    let storage = harvest_storage::create_storage(&config.storage)
        .await
        .with_context(|| format!("failed to open {:?} storage", config.storage.backend))?;
    info!(
        "🏦 storage ready ({:?}, {} records)",
        config.storage.backend,
        storage.count().await?
    );
    Ok(storage)
}

fn report(summary: &RunSummary) {
    for (source, count) in &summary.ingested {
        let dropped = summary.dropped.get(source).copied().unwrap_or_default();
        info!(source = %source, count, dropped, "📥 ingested");
    }
    for error in &summary.errors {
        warn!(source = %error.source, stage = %error.stage, error = %error.message, "⚠️ source failed");
    }
    let elapsed = (summary.finished_at - summary.started_at).num_milliseconds();
    info!(
        "✨ run complete: {} records in {}ms",
        summary.total_ingested(),
        elapsed
    );
}

async fn run(config: &Config, schedule: Schedule, log: Logger) -> Result<()> {
    let extractors = build_extractors(&config.sources).context("invalid source configuration")?;
    info!(
        "🦗 sources: {}",
        extractors.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
    );

    let storage = open_storage(config).await?;
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(config.http.timeout_secs))?);
    let pipeline = Pipeline::new(storage, fetcher)
        .with_concurrency(config.pipeline.concurrency)
        .with_logger(log);

    loop {
        let summary = pipeline.run(&extractors).await;
        report(&summary);

        let Some(delay) = schedule.next_delay(Local::now().naive_local()) else {
            break;
        };
        info!("⏰ next run in {}", HumanDuration(delay));
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("👋 stopping");
                break;
            }
        }
    }
    Ok(())
}

async fn query(config: &Config, query: ContentQuery, json: bool) -> Result<()> {
    let storage = open_storage(config).await?;
    let records = storage.query(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  [{}] {} ({})",
            record.published_at.format("%Y-%m-%d"),
            record.content_type,
            record.title,
            record.source_name
        );
        println!("    {}", record.source_link);
    }
    println!("{} records", records.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = init_logging(&cli.log_level);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { once, every, at } => {
            let schedule = Schedule::from_flags(once, every, at, &config.schedule.daily_at)
                .map_err(anyhow::Error::msg)
                .context("invalid schedule")?;
            run(&config, schedule, log).await?;
        }
        Commands::Query {
            content_type,
            tag,
            limit,
            json,
        } => {
            let mut q = ContentQuery::new().with_limit(limit);
            if let Some(content_type) = content_type {
                q = q.with_type(content_type);
            }
            if let Some(tag) = tag {
                q = q.with_tag(tag);
            }
            query(&config, q, json).await?;
        }
        Commands::Export { out, limit } => {
            let storage = open_storage(&config).await?;
            let records = storage.query(&ContentQuery::new().with_limit(limit)).await?;
            let written = export::export_records(&records, &out)?;
            info!("📝 exported {} posts to {}", written.len(), out.display());
        }
        Commands::Sources => {
            for source in &config.sources {
                println!("{:<14} {:<6} {}", source.name, source.kind.as_str(), source.base_url);
            }
        }
        Commands::Serve { addr } => {
            let storage = open_storage(&config).await?;
            harvest_web::serve(&addr, harvest_web::AppState::new(storage))
                .await
                .with_context(|| format!("failed to serve on {}", addr))?;
        }
    }

    Ok(())
}
