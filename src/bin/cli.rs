//! skitter CLI
//!
//! Drives one crawl engine per target pattern and streams extracted items
//! as JSON lines. Blocked crawls are resumed with a simple wait-and-retry
//! policy; anything smarter (egress rotation, operator paging) belongs in a
//! custom observer built on the library.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use skitter::{
    engine::{CrawlEngine, CrawlHandle},
    error::{AppError, Result},
    events::LifecycleEvent,
    extract::SelectorExtractor,
    models::{Config, CrawlSeed},
    template::AddressTemplate,
    transport::HttpTransport,
};

/// Pause before asking a blocked crawl to try again.
const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// skitter - paginated crawl engine
#[derive(Parser, Debug)]
#[command(name = "skitter", version, about = "Paginated crawl engine")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one or more paginated targets
    Crawl {
        /// Address patterns with {offset}/{window} placeholders; falls back
        /// to the configured address when empty
        patterns: Vec<String>,

        /// Starting offset override
        #[arg(long)]
        offset: Option<u64>,

        /// Page window override
        #[arg(long)]
        window: Option<u64>,

        /// Append items to this file instead of stdout (JSON lines)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Crawl {
            patterns,
            offset,
            window,
            output,
        } => {
            let config = Config::load_or_default(&cli.config);

            let targets = if patterns.is_empty() {
                let configured = config
                    .address
                    .clone()
                    .ok_or_else(|| AppError::config("no address pattern given or configured"))?;
                vec![configured]
            } else {
                patterns
            };

            let seed = CrawlSeed {
                offset,
                window_size: window,
                ..CrawlSeed::default()
            };

            let runs = targets
                .iter()
                .map(|pattern| run_target(&config, pattern, seed.clone(), output.clone()));

            let mut first_error = None;
            for (pattern, outcome) in targets.iter().zip(join_all(runs).await) {
                if let Err(error) = outcome {
                    log::error!("{pattern}: {error}");
                    first_error.get_or_insert(error);
                }
            }
            if let Some(error) = first_error {
                return Err(error);
            }
        }

        Command::Validate => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!("configuration OK");
        }
    }

    Ok(())
}

/// Run one crawl to completion, streaming its items to the sink.
async fn run_target(
    config: &Config,
    pattern: &str,
    seed: CrawlSeed,
    output: Option<PathBuf>,
) -> Result<()> {
    let selectors = config
        .selectors
        .as_ref()
        .ok_or_else(|| AppError::config("a [selectors] section is required for crawling"))?;

    let extractor = SelectorExtractor::new(selectors)?;
    let transport = HttpTransport::new(&config.crawl)?;
    let template = AddressTemplate::from_pattern(pattern);

    let mut engine = CrawlEngine::new(config.crawl.clone(), template, transport, extractor)?;
    let mut events = engine.subscribe();

    let mut sink: Box<dyn Write + Send> = match &output {
        Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        None => Box::new(std::io::stdout()),
    };

    let started_at = Utc::now();
    engine.start(seed);

    while let Some(event) = events.recv().await {
        match event {
            LifecycleEvent::Start { params, .. } => {
                log::info!(
                    "{pattern}: starting at offset {} (window {})",
                    params.offset,
                    params.window_size
                );
            }
            LifecycleEvent::Move { request } => {
                log::debug!("{pattern}: fetching {}", request.address);
            }
            LifecycleEvent::Data { items, page, .. } => {
                log::info!("{pattern}: page {page} yielded {} items", items.len());
                for item in &items {
                    writeln!(sink, "{}", serde_json::to_string(item)?)?;
                }
            }
            LifecycleEvent::Blocked {
                error,
                counts,
                handle,
                ..
            } => {
                log::warn!(
                    "{pattern}: blocked ({} {}), retry {} in {:?}",
                    error.code,
                    error.message,
                    counts.retries,
                    RETRY_PAUSE
                );
                retry_after(handle, RETRY_PAUSE);
            }
            LifecycleEvent::Finish { payload, counts } => {
                let elapsed = Utc::now() - started_at;
                log::info!(
                    "{pattern}: code {} ({}) after {:.1}s; {} pages, {} items, {} retries",
                    payload.code,
                    payload.message,
                    elapsed.num_milliseconds() as f64 / 1000.0,
                    counts.pages,
                    counts.items,
                    counts.retries
                );
                break;
            }
        }
    }

    Ok(())
}

/// Wait-and-retry remediation for blocked crawls.
fn retry_after(handle: CrawlHandle, pause: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(pause).await;
        handle.advance();
    });
}
