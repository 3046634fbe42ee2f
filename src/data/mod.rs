//! Core data models for the price tracker
//!
//! This module contains the time range selector, the raw upstream response shape,
//! and the chart-ready points derived from it.

pub mod history;

pub use history::{FetchError, HistoryClient, PriceSource};

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// User-selectable display window
///
/// Drives both the query parameters sent upstream and the cache partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "5D")]
    FiveDays,
    #[serde(rename = "1W")]
    OneWeek,
    #[default]
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl TimeRange {
    /// All ranges in selector order
    pub const ALL: [TimeRange; 6] = [
        TimeRange::OneDay,
        TimeRange::FiveDays,
        TimeRange::OneWeek,
        TimeRange::OneMonth,
        TimeRange::OneYear,
        TimeRange::FiveYears,
    ];

    /// Short label shown in the selector and used in cache keys
    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::OneDay => "1D",
            TimeRange::FiveDays => "5D",
            TimeRange::OneWeek => "1W",
            TimeRange::OneMonth => "1M",
            TimeRange::OneYear => "1Y",
            TimeRange::FiveYears => "5Y",
        }
    }

    /// Parses a range label, ignoring case
    ///
    /// Returns `None` if the label doesn't match any range.
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|range| range.label().eq_ignore_ascii_case(s))
    }

    /// Upstream query parameters for this range
    pub fn query_params(&self) -> QueryParams {
        let (interval, period) = match self {
            TimeRange::OneDay => ("30m", "1d"),
            TimeRange::FiveDays => ("90m", "5d"),
            TimeRange::OneWeek => ("2h", "1w"),
            TimeRange::OneMonth => ("1d", "1mo"),
            TimeRange::OneYear => ("1wk", "12mo"),
            TimeRange::FiveYears => ("1mo", "60mo"),
        };
        QueryParams { interval, period }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bar size and lookback window requested from the history endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParams {
    pub interval: &'static str,
    pub period: &'static str,
}

/// One price record from the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    /// Upstream display date, unused downstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// UTC epoch seconds
    pub date_utc: i64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub adjclose: f64,
}

/// Metadata block of a history response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: String,
    #[serde(rename = "processedTime", default)]
    pub processed_time: String,
    /// Remaining upstream meta fields, kept so cached payloads match what was received
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Full body of a history response
///
/// `body` is keyed by opaque identifiers; only the point contents matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub meta: ResponseMeta,
    pub body: HashMap<String, RawPricePoint>,
}

/// A (date, value) pair consumed by the display surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// ISO-8601 UTC timestamp with millisecond precision
    pub date: String,
    /// Closing price
    pub value: f64,
}

/// Errors that can occur while deriving chart points
#[derive(Debug, Error)]
pub enum TransformError {
    /// The point timestamp can't be represented as a date
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

/// Converts a raw response into chart points sorted by date ascending
///
/// Pure: the cache-hit path feeds a stored response through the same function.
pub fn transform_data(response: &RawResponse) -> Result<Vec<ChartPoint>, TransformError> {
    let mut points: Vec<&RawPricePoint> = response.body.values().collect();
    points.sort_by_key(|point| point.date_utc);

    points
        .into_iter()
        .map(|point| -> Result<ChartPoint, TransformError> {
            let millis = point
                .date_utc
                .checked_mul(1000)
                .ok_or(TransformError::TimestampOutOfRange(point.date_utc))?;
            let date = DateTime::from_timestamp_millis(millis)
                .ok_or(TransformError::TimestampOutOfRange(point.date_utc))?;
            Ok(ChartPoint {
                date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
                value: point.close,
            })
        })
        .collect()
}
