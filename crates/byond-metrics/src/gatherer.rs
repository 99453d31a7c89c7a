//! Metrics gatherer — one authenticated topic query per scrape.
//!
//! Builds the `prometheus_metrics` query, runs it against the transport
//! under a fixed deadline, and decodes the JSON reply into metric families.
//! The gatherer holds only the transport handle and the key, so concurrent
//! scrapes share nothing mutable.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use byond_topic::{QueryClient, QueryTransport, TopicError};
use thiserror::Error;
use tracing::debug;

use crate::model::{self, MetricFamily};

/// Topic command that makes the game server render its metrics.
pub const BASE_COMMAND: &str = "prometheus_metrics";

/// Deadline applied to every gather, measured from call entry.
pub const GATHER_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport flag passed unchanged with every metrics query.
pub const STRUCTURED_RESPONSE: bool = true;

/// Errors surfaced to the scrape caller. None of them are retried.
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("topic query failed: {0}")]
    Transport(#[from] TopicError),

    #[error("topic query timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to decode metric families: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Boxed future alias for gather results.
pub type GatherFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<MetricFamily>, GatherError>> + Send + 'a>>;

/// Pull interface used by the scrape server: one call per scrape.
pub trait Gatherer: Send + Sync {
    fn gather(&self) -> GatherFuture<'_>;
}

/// Polls a BYOND server for its metric families.
pub struct MetricsGatherer {
    transport: Arc<dyn QueryTransport>,
    key: String,
}

impl MetricsGatherer {
    /// Create a gatherer over an existing transport.
    pub fn new(transport: Arc<dyn QueryTransport>, key: impl Into<String>) -> Self {
        Self {
            transport,
            key: key.into(),
        }
    }

    /// Create a gatherer that queries `host` over the topic protocol.
    pub fn connect(host: &str, key: impl Into<String>) -> Self {
        Self::new(Arc::new(QueryClient::new(host)), key)
    }

    /// The query string sent upstream, including the key suffix when set.
    pub fn query(&self) -> String {
        if self.key.is_empty() {
            BASE_COMMAND.to_string()
        } else {
            format!("{BASE_COMMAND};key={}", self.key)
        }
    }

    /// Run one gather cycle.
    pub async fn gather(&self) -> Result<Vec<MetricFamily>, GatherError> {
        let started = Instant::now();
        let query = self.query();

        let raw = tokio::time::timeout(
            GATHER_TIMEOUT,
            self.transport.query(query.as_bytes(), STRUCTURED_RESPONSE),
        )
        .await
        .map_err(|_| GatherError::Timeout(GATHER_TIMEOUT))??;

        let families = model::decode_families(&raw)?;

        debug!(
            families = families.len(),
            bytes = raw.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            authenticated = !self.key.is_empty(),
            "gathered metrics"
        );
        Ok(families)
    }
}

impl Gatherer for MetricsGatherer {
    fn gather(&self) -> GatherFuture<'_> {
        Box::pin(MetricsGatherer::gather(self))
    }
}

impl fmt::Debug for MetricsGatherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsGatherer")
            .field("key", &if self.key.is_empty() { "<none>" } else { "<redacted>" })
            .finish_non_exhaustive()
    }
}
