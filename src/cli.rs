//! Command-line interface parsing for pricewatch
//!
//! This module handles parsing of CLI arguments using clap and turns them into the
//! startup configuration: selected range, ticker, cache location and refresh timing.

use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::cache_namespace;
use crate::data::TimeRange;
use crate::refresh::RefreshConfig;

/// Environment variable holding the RapidAPI key
pub const API_KEY_VAR: &str = "RAPIDAPI_KEY";

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified range label is not recognized
    #[error("Invalid range: '{0}'. Valid ranges: 1D, 5D, 1W, 1M, 1Y, 5Y")]
    InvalidRange(String),

    /// No API key was configured
    #[error("Missing environment variable: {0}")]
    MissingApiKey(String),
}

/// pricewatch - Track historical stock prices from the terminal
#[derive(Parser, Debug)]
#[command(name = "pricewatch")]
#[command(about = "Historical stock price tracker with a local expiring cache")]
#[command(version)]
pub struct Cli {
    /// Time range to show
    ///
    /// Valid ranges: 1D, 5D, 1W, 1M, 1Y, 5Y
    #[arg(short, long, value_name = "RANGE", default_value = "1M")]
    pub range: String,

    /// Ticker symbol to fetch
    #[arg(short, long, default_value = "NVDA")]
    pub symbol: String,

    /// Keep running and refresh on a timer; type a range on stdin to switch
    #[arg(short, long)]
    pub watch: bool,

    /// Print chart points as JSON
    #[arg(long)]
    pub json: bool,

    /// Override the API base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Store the cache in this directory instead of the user cache directory
    #[arg(long, value_name = "DIR", conflicts_with = "no_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds between automatic refreshes in watch mode (0 disables polling)
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub poll_secs: u64,
}

/// Where cache entries are kept
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheLocation {
    /// The XDG user cache directory
    #[default]
    UserCache,
    /// A caller-chosen directory
    Dir(PathBuf),
    /// Process memory only
    Memory,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Initially selected range
    pub range: TimeRange,
    /// Ticker symbol to fetch
    pub symbol: String,
    /// Whether to keep polling
    pub watch: bool,
    /// Whether to print JSON instead of text
    pub json: bool,
    /// API base URL override
    pub base_url: Option<String>,
    /// Cache location
    pub cache: CacheLocation,
    /// Refresh timing
    pub refresh: RefreshConfig,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            range: TimeRange::default(),
            symbol: "NVDA".to_string(),
            watch: false,
            json: false,
            base_url: None,
            cache: CacheLocation::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

/// Parses a range string argument into a TimeRange.
///
/// # Returns
/// * `Ok(TimeRange)` if the string matches a valid range label
/// * `Err(CliError::InvalidRange)` if the string doesn't match
pub fn parse_range_arg(s: &str) -> Result<TimeRange, CliError> {
    TimeRange::from_label(s).ok_or_else(|| CliError::InvalidRange(s.to_string()))
}

/// Reads the API key from the environment
pub fn api_key_from_env() -> Result<SecretString, CliError> {
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
        .ok_or_else(|| CliError::MissingApiKey(API_KEY_VAR.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if an invalid range was specified
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let range = parse_range_arg(&cli.range)?;

        let cache = match (&cli.cache_dir, cli.no_cache) {
            (_, true) => CacheLocation::Memory,
            (Some(dir), false) => CacheLocation::Dir(dir.clone()),
            (None, false) => CacheLocation::UserCache,
        };

        let symbol = cli.symbol.trim().to_uppercase();
        let refresh = RefreshConfig {
            poll_interval: Duration::from_secs(cli.poll_secs),
            enabled: cli.poll_secs > 0,
            namespace: cache_namespace(&symbol),
            ..RefreshConfig::default()
        };

        Ok(StartupConfig {
            range,
            symbol,
            watch: cli.watch,
            json: cli.json,
            base_url: cli.base_url.clone(),
            cache,
            refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_arg_all_labels() {
        assert_eq!(parse_range_arg("1D").unwrap(), TimeRange::OneDay);
        assert_eq!(parse_range_arg("5D").unwrap(), TimeRange::FiveDays);
        assert_eq!(parse_range_arg("1W").unwrap(), TimeRange::OneWeek);
        assert_eq!(parse_range_arg("1M").unwrap(), TimeRange::OneMonth);
        assert_eq!(parse_range_arg("1Y").unwrap(), TimeRange::OneYear);
        assert_eq!(parse_range_arg("5Y").unwrap(), TimeRange::FiveYears);
    }

    #[test]
    fn test_parse_range_arg_lowercase() {
        assert_eq!(parse_range_arg("1y").unwrap(), TimeRange::OneYear);
    }

    #[test]
    fn test_parse_range_arg_invalid() {
        let result = parse_range_arg("3M");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
        assert!(err.to_string().contains("3M"));
    }

    #[test]
    fn test_startup_config_default() {
        let config = StartupConfig::default();
        assert_eq!(config.range, TimeRange::OneMonth);
        assert_eq!(config.symbol, "NVDA");
        assert!(!config.watch);
        assert_eq!(config.cache, CacheLocation::UserCache);
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["pricewatch"]);
        assert_eq!(cli.range, "1M");
        assert_eq!(cli.symbol, "NVDA");
        assert_eq!(cli.poll_secs, 60);
        assert!(!cli.watch);
    }

    #[test]
    fn test_startup_config_from_cli_no_args() {
        let cli = Cli::parse_from(["pricewatch"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.range, TimeRange::OneMonth);
        assert_eq!(config.refresh.poll_interval, Duration::from_secs(60));
        assert!(config.refresh.enabled);
        assert_eq!(config.cache, CacheLocation::UserCache);
    }

    #[test]
    fn test_startup_config_from_cli_full() {
        let cli = Cli::parse_from([
            "pricewatch",
            "--range",
            "5y",
            "--symbol",
            "amd",
            "--watch",
            "--json",
            "--cache-dir",
            "/tmp/pw",
            "--poll-secs",
            "0",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.range, TimeRange::FiveYears);
        assert_eq!(config.symbol, "AMD");
        assert_eq!(config.refresh.namespace, "amd-stock-data");
        assert!(config.watch);
        assert!(config.json);
        assert_eq!(config.cache, CacheLocation::Dir(PathBuf::from("/tmp/pw")));
        assert!(!config.refresh.enabled);
    }

    #[test]
    fn test_startup_config_no_cache() {
        let cli = Cli::parse_from(["pricewatch", "--no-cache"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.cache, CacheLocation::Memory);
    }

    #[test]
    fn test_cache_dir_conflicts_with_no_cache() {
        let result = Cli::try_parse_from(["pricewatch", "--no-cache", "--cache-dir", "/tmp/x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_startup_config_from_cli_invalid_range() {
        let cli = Cli::parse_from(["pricewatch", "--range", "2W"]);
        assert!(StartupConfig::from_cli(&cli).is_err());
    }
}
