//! CLI entry point for nursery_log.
//!
//! Runs the HTTP API, computes weekly averages offline from a CSV data
//! directory, pulls a report from a running server, and appends events to a
//! data directory.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use nursery_log::analyzers::weekly_report_at;
use nursery_log::fetch::{BasicClient, auth::ParentHeader, fetch_weekly_report};
use nursery_log::output::{print_json, print_pretty};
use nursery_log::records::{ChangeKind, ChildId, FeedRecord, ParentId, SleepLocation};
use nursery_log::server::{self, DEFAULT_ADDR, ServerConfig};
use nursery_log::store::{
    ChangeRow, EventStore, FeedRow, MemoryStore, SleepRow, append_event_row, load_data_dir,
};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "nursery_log")]
#[command(about = "Log a baby's feeds, changes and sleeps and track weekly averages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    ///
    /// The data directory is only read on start-up. Records created through
    /// the API are kept in memory and are not written back to it.
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "NURSERY_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,

        /// CSV data directory to load on start-up
        #[arg(short, long, env = "NURSERY_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Compute a child's weekly averages from a CSV data directory
    Averages {
        #[arg(short, long, env = "NURSERY_DATA_DIR")]
        data_dir: PathBuf,

        /// Child id
        #[arg(short, long)]
        child: ChildId,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch a child's weekly averages from a running server
    Report {
        /// Base URL of the server
        #[arg(short, long, env = "NURSERY_SERVER_URL", default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Parent id sent as X-Parent-Id
        #[arg(short, long, env = "NURSERY_PARENT_ID")]
        parent: ParentId,

        /// Child id
        #[arg(short, long)]
        child: ChildId,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Append an event to a CSV data directory
    Log {
        #[arg(short, long, env = "NURSERY_DATA_DIR")]
        data_dir: PathBuf,

        /// Child id
        #[arg(short, long)]
        child: ChildId,

        #[command(subcommand)]
        event: LogEvent,
    },
}

#[derive(Subcommand)]
enum LogEvent {
    /// Log a feed
    Feed {
        /// breast or bottle
        #[arg(short, long)]
        kind: String,

        /// When the feed happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Minutes on the right breast
        #[arg(long)]
        right: Option<f64>,

        /// Minutes on the left breast
        #[arg(long)]
        left: Option<f64>,

        /// Bottle volume
        #[arg(long)]
        volume: Option<f64>,

        #[arg(long)]
        throw_up: Option<bool>,
    },
    /// Log a diaper change
    Change {
        /// wet, dirty, both or nothing
        #[arg(short, long)]
        kind: String,

        #[arg(long)]
        consistency: String,

        /// When the change happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Log a sleep session
    Sleep {
        /// Start time (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// End time (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,

        /// Parents Bed, Crib, Stroller or Car
        #[arg(long)]
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nursery_log.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nursery_log.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr, data_dir } => {
            let config = ServerConfig { addr, data_dir };
            config.validate()?;

            let store = match &config.data_dir {
                Some(dir) => load_data_dir(dir)?,
                None => {
                    info!("No data directory given, starting with an empty store");
                    MemoryStore::new()
                }
            };
            server::serve(&config, Arc::new(store)).await?;
        }
        Commands::Averages {
            data_dir,
            child,
            json,
        } => {
            let store = load_data_dir(&data_dir)?;
            if store.child(child).await?.is_none() {
                bail!("child {child} not found in {}", data_dir.display());
            }

            let report = weekly_report_at(&store, child, Utc::now()).await?;
            if json {
                print_json(&report)?;
            } else {
                print_pretty(&report);
            }
        }
        Commands::Report {
            server,
            parent,
            child,
            json,
        } => {
            let client = ParentHeader::new(BasicClient::new(), parent)?;
            let report = fetch_weekly_report(&client, &server, child).await?;
            if json {
                print_json(&report)?;
            } else {
                print_pretty(&report);
            }
        }
        Commands::Log {
            data_dir,
            child,
            event,
        } => {
            log_event(&data_dir, child, event)?;
        }
    }

    Ok(())
}

/// Validates one event and appends it to the child's CSV file.
#[tracing::instrument(skip_all, fields(data_dir = %data_dir.display(), child_id = %child))]
fn log_event(data_dir: &Path, child: ChildId, event: LogEvent) -> Result<()> {
    let id = Uuid::new_v4();
    match event {
        LogEvent::Feed {
            kind,
            at,
            right,
            left,
            volume,
            throw_up,
        } => {
            let row = FeedRow {
                id: Some(id),
                date_and_time: at.unwrap_or_else(Utc::now),
                kind,
                right_breast_duration: right,
                left_breast_duration: left,
                bottle_volume: volume,
                throw_up,
            };
            let feed = FeedRecord::try_from(row)?;
            append_event_row(data_dir, child, &FeedRow::from(&feed))?;
            info!(feed_id = %feed.id, "Feed logged");
        }
        LogEvent::Change {
            kind,
            consistency,
            at,
        } => {
            let kind: ChangeKind = kind.parse().map_err(anyhow::Error::msg)?;
            if consistency.trim().is_empty() {
                bail!("consistency must not be empty");
            }
            append_event_row(
                data_dir,
                child,
                &ChangeRow {
                    id: Some(id),
                    date_and_time: at.unwrap_or_else(Utc::now),
                    kind,
                    consistency,
                },
            )?;
            info!(change_id = %id, "Change logged");
        }
        LogEvent::Sleep {
            start,
            end,
            location,
        } => {
            let location: SleepLocation = location.parse().map_err(anyhow::Error::msg)?;
            append_event_row(
                data_dir,
                child,
                &SleepRow {
                    id: Some(id),
                    start_time: start,
                    end_time: end,
                    location,
                },
            )?;
            info!(sleep_id = %id, "Sleep logged");
        }
    }
    Ok(())
}
