//! byond-api — HTTP scrape surface for the BYOND exporter.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition, gathered fresh per request |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use byond_metrics::Gatherer;

/// Shared state for scrape handlers.
#[derive(Clone)]
pub struct ApiState {
    pub gatherer: Arc<dyn Gatherer>,
}

/// Build the scrape router.
pub fn build_router(gatherer: Arc<dyn Gatherer>) -> Router {
    let state = ApiState { gatherer };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
