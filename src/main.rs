//! # KITIS Schedule
//!
//! Command-line driver for the schedule scraper. Discovers the sources the
//! college publishes, renders a source's schedule or lesson-accounting
//! records as chat-ready text, and checks whether the site is up.
//!
//! ## Usage
//!
//! ```sh
//! kitis_schedule status
//! kitis_schedule catalog --kind room
//! kitis_schedule schedule --kind group --source ИС-21
//! kitis_schedule dump --url http://94.72.18.202:8083/cg42.htm --out fixtures/cg42.htm
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: Read every configured index page into a catalog
//! 2. **Fetching**: Download the detail page of the requested source
//! 3. **Parsing**: Turn the page table into days and lessons
//! 4. **Output**: Print the escaped message, optionally write JSON

use clap::Parser;
use kitis_schedule::api::{PageFetcher, build_fetcher};
use kitis_schedule::config::{AppConfig, ConfigError, load_config};
use kitis_schedule::models::{Section, SourceKind};
use kitis_schedule::outputs::json;
use kitis_schedule::scrapers::codec::to_utf8_page;
use kitis_schedule::service::{Outcome, ScheduleService};
use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(ConfigError::Io { path, source }) if source.kind() == ErrorKind::NotFound => {
            warn!(%path, "Config file not found; using built-in defaults");
            AppConfig::default()
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    let fetcher = build_fetcher(&config.fetch)?;
    let service = ScheduleService::new(config, fetcher)?;
    run(&service, args.command).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn run<F: PageFetcher>(
    service: &ScheduleService<F>,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Status => {
            println!("{}", service.status_message().await);
        }
        Command::Catalog { kind } => {
            let catalog = service.refresh_catalog().await;
            let kinds: Vec<SourceKind> = kind.map_or_else(|| SourceKind::ALL.to_vec(), |k| vec![k]);
            for section in [Section::Schedule, Section::Records] {
                for kind in &kinds {
                    let Some(sources) = catalog.sources(section, *kind) else {
                        continue;
                    };
                    println!("[{:?}/{}] {} sources", section, kind, sources.len());
                    for entry in sources.iter() {
                        println!("{}\t{}", entry.display_name, entry.detail_url);
                    }
                }
            }
        }
        Command::Schedule {
            kind,
            source,
            truncate,
            json: json_path,
        } => {
            service.refresh_catalog().await;
            let outcome = service.schedule(kind, &source).await;
            println!("{}", service.render_schedule_outcome(&outcome, truncate));
            match (json_path, &outcome) {
                (Some(path), Outcome::Ready(schedule)) => json::write_schedule(schedule, &path).await?,
                (Some(path), other) => {
                    warn!(path = %path.display(), outcome = ?other, "No schedule to write")
                }
                (None, _) => {}
            }
        }
        Command::Records { kind, source } => {
            service.refresh_catalog().await;
            println!("{}", service.records_message(kind, &source).await);
        }
        Command::Dump { url, out } => dump_page(service.fetcher(), &url, &out).await?,
    }
    Ok(())
}

/// Save a page's decoded text with its charset declaration rewritten to UTF-8.
#[instrument(level = "info", skip(fetcher))]
async fn dump_page<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let raw = fetcher.fetch(url).await?;
    let text = to_utf8_page(&raw);

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(out, &text).await?;
    info!(path = %out.display(), bytes = text.len(), "Saved page");
    Ok(())
}
