//! pricewatch - Track historical stock prices from the terminal
//!
//! Fetches price history for one ticker, caches it for five minutes and prints
//! chart-ready points. In watch mode the data refreshes every minute and the time
//! range can be switched from stdin.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use pricewatch::cache::CacheStore;
use pricewatch::cli::{api_key_from_env, CacheLocation, Cli, StartupConfig};
use pricewatch::data::history::DEFAULT_HOST;
use pricewatch::data::{ChartPoint, HistoryClient, TimeRange};
use pricewatch::display::{render_json, render_text};
use pricewatch::refresh::{RefreshController, RefreshHandle, RefreshMessage};

/// Sets up logging to stderr, honouring `RUST_LOG` and `PRICEWATCH_LOG_FORMAT`
fn init_tracing() {
    let log_format =
        std::env::var("PRICEWATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Opens the cache for the configured location
fn open_cache(location: &CacheLocation) -> CacheStore {
    match location {
        CacheLocation::UserCache => CacheStore::new().unwrap_or_else(|| {
            tracing::warn!("no user cache directory, caching in memory");
            CacheStore::in_memory()
        }),
        CacheLocation::Dir(dir) => CacheStore::with_dir(dir.clone()),
        CacheLocation::Memory => CacheStore::in_memory(),
    }
}

/// Prints points in the configured format
fn print_points(
    config: &StartupConfig,
    range: TimeRange,
    points: &[ChartPoint],
) -> Result<(), serde_json::Error> {
    if config.json {
        println!("{}", render_json(points)?);
    } else {
        print!("{}", render_text(&config.symbol, range, points));
    }
    Ok(())
}

/// Fetches once and prints the result
async fn run_once(
    controller: RefreshController,
    config: &StartupConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match controller.refresh(config.range).await {
        Ok(points) => {
            print_points(config, config.range, &points)?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "error fetching stock data");
            eprintln!("Error fetching stock data: {}", e);
            process::exit(1);
        }
    }
}

/// Applies one line of stdin input, returning false when the user asked to quit
fn handle_input(handle: &mut RefreshHandle, input: &str) -> bool {
    match input {
        "" => {}
        "q" | "quit" => return false,
        "r" | "refresh" => handle.request_refresh(),
        other => match TimeRange::from_label(other) {
            Some(range) => handle.set_range(range),
            None => eprintln!("Unknown range '{}'. Valid ranges: 1D, 5D, 1W, 1M, 1Y, 5Y", other),
        },
    }
    true
}

/// Polls until the user quits, printing each update
async fn watch(
    controller: RefreshController,
    config: &StartupConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut handle = RefreshHandle::spawn(controller, config.range);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    eprintln!("Type a range (1D, 5D, 1W, 1M, 1Y, 5Y), 'r' to refresh or 'q' to quit");

    loop {
        tokio::select! {
            message = handle.receiver.recv() => match message {
                Some(RefreshMessage::RefreshStarted { range }) => {
                    eprintln!("Loading {} {}...", config.symbol, range);
                }
                Some(RefreshMessage::DataUpdated { range, points }) => {
                    // Ignore results for a range that's no longer selected
                    if range == handle.range() {
                        print_points(config, range, &points)?;
                    }
                }
                Some(RefreshMessage::RefreshError { range, message }) => {
                    eprintln!("Refresh failed for {}: {} (keeping last data)", range, message);
                }
                Some(RefreshMessage::RefreshCompleted { .. }) => {}
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_input(&mut handle, line.trim()) {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading stdin");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    init_tracing();

    let api_key = match api_key_from_env() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let mut client = HistoryClient::new(&api_key, DEFAULT_HOST)?.with_symbol(&config.symbol);
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url);
    }

    let cache = Arc::new(open_cache(&config.cache));
    let controller = RefreshController::new(Arc::new(client), cache, config.refresh.clone());

    if config.watch {
        watch(controller, &config).await
    } else {
        run_once(controller, &config).await
    }
}
