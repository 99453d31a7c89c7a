//! byond-metrics — turns a BYOND game server into a Prometheus target.
//!
//! The game server renders its own metric families as JSON in reply to a
//! `prometheus_metrics` topic query. This crate resolves the comms key,
//! polls the server once per scrape, decodes the reply, and renders the
//! Prometheus text exposition format.
//!
//! # Architecture
//!
//! ```text
//! resolve_key()          ← once at startup (flag / config.txt)
//!
//! MetricsGatherer
//!   ├── query()          → "prometheus_metrics[;key=...]"
//!   └── gather()         → QueryTransport under a 30s deadline
//!                          → Vec<MetricFamily>
//!
//! Prometheus exposition
//!   └── encode_text()    → text/plain for /metrics endpoint
//! ```

pub mod gatherer;
pub mod key;
pub mod model;
pub mod prometheus;

pub use gatherer::{GatherError, GatherFuture, Gatherer, MetricsGatherer};
pub use key::{KeyError, KeyLookup, resolve_key};
pub use model::MetricFamily;
pub use prometheus::{CONTENT_TYPE, EncodeError, encode_text};
