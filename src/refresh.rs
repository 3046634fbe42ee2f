//! Price data refresh controller
//!
//! `RefreshController::refresh` serves chart points from the cache when fresh and
//! otherwise fetches them upstream. `RefreshHandle` owns the selected range and a
//! single polling task that re-runs the refresh on a fixed interval, reporting
//! results over a tokio channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{cache_key, is_expired, CacheEntry, CacheStore, CACHE_NAME};
use crate::data::{transform_data, ChartPoint, FetchError, PriceSource, TimeRange};

/// Messages sent from the polling task to the display
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshMessage {
    /// A refresh attempt started
    RefreshStarted { range: TimeRange },
    /// New chart points are available
    DataUpdated {
        range: TimeRange,
        points: Vec<ChartPoint>,
    },
    /// A refresh attempt failed; previously shown data should stay on screen
    RefreshError { range: TimeRange, message: String },
    /// A refresh attempt finished, successfully or not
    RefreshCompleted { range: TimeRange },
}

/// Configuration for refresh timing
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between automatic refreshes
    pub poll_interval: Duration,
    /// Pause before every upstream request
    pub request_delay: Duration,
    /// Whether automatic polling is enabled
    pub enabled: bool,
    /// Namespace prefix for cache keys
    pub namespace: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            request_delay: Duration::from_millis(500),
            enabled: true,
            namespace: CACHE_NAME.to_string(),
        }
    }
}

/// Fetch-or-serve-from-cache logic for one ticker
#[derive(Clone)]
pub struct RefreshController {
    source: Arc<dyn PriceSource>,
    cache: Arc<CacheStore>,
    config: RefreshConfig,
}

impl RefreshController {
    pub fn new(source: Arc<dyn PriceSource>, cache: Arc<CacheStore>, config: RefreshConfig) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Returns chart points for `range`
    ///
    /// # Behavior
    /// - A cached entry younger than the cache duration is transformed and returned
    ///   without touching the network
    /// - Otherwise waits `request_delay`, fetches upstream, caches the raw response
    ///   and returns the transformed points
    /// - Upstream failures are returned and leave the cache untouched
    pub async fn refresh(&self, range: TimeRange) -> Result<Vec<ChartPoint>, FetchError> {
        let key = cache_key(&self.config.namespace, range.label());

        if let Some(entry) = self.cache.get(&key) {
            if !is_expired(entry.timestamp) {
                tracing::debug!(%range, key = %key, "serving from cache");
                return Ok(transform_data(&entry.data)?);
            }
            tracing::debug!(%range, key = %key, "cache entry expired");
        }

        let params = range.query_params();
        tokio::time::sleep(self.config.request_delay).await;

        let response = self.source.fetch_history(params).await?;
        let points = transform_data(&response)?;

        self.cache.set(&key, &CacheEntry::now(response));
        tracing::info!(%range, points = points.len(), "fetched price history");

        Ok(points)
    }
}

/// Handle for controlling the polling task
///
/// Exactly one polling task is alive at a time. Changing the range aborts the old
/// task, including any refresh it has in flight, and starts a new one that
/// refreshes immediately.
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    sender: mpsc::Sender<RefreshMessage>,
    controller: RefreshController,
    range: TimeRange,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Creates a RefreshHandle and starts polling `range`
    pub fn spawn(controller: RefreshController, range: TimeRange) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let mut handle = Self {
            receiver,
            sender,
            controller,
            range,
            task: None,
        };
        handle.arm();
        handle
    }

    /// Currently selected range
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Switches to `range`, replacing the polling task
    ///
    /// Selecting the range that is already active does nothing.
    pub fn set_range(&mut self, range: TimeRange) {
        if range == self.range {
            return;
        }
        tracing::info!(from = %self.range, to = %range, "time range changed");
        self.range = range;
        self.arm();
    }

    /// Restarts polling for the current range with an immediate refresh
    pub fn request_refresh(&mut self) {
        self.arm();
    }

    /// Stops the polling task
    pub fn shutdown(mut self) {
        self.disarm();
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn arm(&mut self) {
        self.disarm();

        let controller = self.controller.clone();
        let sender = self.sender.clone();
        let range = self.range;
        let poll_interval = Some(controller.config().poll_interval)
            .filter(|interval| controller.config().enabled && !interval.is_zero());

        self.task = Some(tokio::spawn(async move {
            let Some(period) = poll_interval else {
                run_once(&controller, range, &sender).await;
                return;
            };

            // First tick completes immediately
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !run_once(&controller, range, &sender).await {
                    break;
                }
            }
        }));
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Runs one refresh and reports it, returning false once the receiver is gone
async fn run_once(
    controller: &RefreshController,
    range: TimeRange,
    tx: &mpsc::Sender<RefreshMessage>,
) -> bool {
    if tx.send(RefreshMessage::RefreshStarted { range }).await.is_err() {
        return false;
    }

    let message = match controller.refresh(range).await {
        Ok(points) => RefreshMessage::DataUpdated { range, points },
        Err(e) => {
            tracing::error!(%range, error = %e, "error fetching stock data");
            RefreshMessage::RefreshError {
                range,
                message: e.to_string(),
            }
        }
    };

    tx.send(message).await.is_ok()
        && tx
            .send(RefreshMessage::RefreshCompleted { range })
            .await
            .is_ok()
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}
