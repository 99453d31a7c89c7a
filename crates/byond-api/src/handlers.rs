//! Scrape handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::ApiState;

/// GET /metrics — run one gather cycle and render it.
///
/// Any gather or encoding failure fails this scrape only.
pub async fn prometheus_metrics(State(state): State<ApiState>) -> Response {
    let families = match state.gatherer.gather().await {
        Ok(families) => families,
        Err(e) => {
            error!(error = %e, "error gathering metrics");
            return scrape_error(&e);
        }
    };

    match byond_metrics::encode_text(&families) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", byond_metrics::CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "error encoding metric family");
            scrape_error(&e)
        }
    }
}

fn scrape_error(err: &dyn std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [("content-type", "text/plain; charset=utf-8")],
        format!("An error has occurred while serving metrics:\n\n{err}"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use byond_metrics::{GatherError, GatherFuture, Gatherer, MetricFamily};
    use byond_metrics::model::{Gauge, Metric, MetricType};
    use http_body_util::BodyExt;

    struct FixedGatherer(fn() -> Result<Vec<MetricFamily>, GatherError>);

    impl Gatherer for FixedGatherer {
        fn gather(&self) -> GatherFuture<'_> {
            let result = (self.0)();
            Box::pin(async move { result })
        }
    }

    fn test_state(f: fn() -> Result<Vec<MetricFamily>, GatherError>) -> ApiState {
        ApiState {
            gatherer: Arc::new(FixedGatherer(f)),
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_families() {
        let state = test_state(|| {
            Ok(vec![MetricFamily {
                name: "up".to_string(),
                help: None,
                metric_type: MetricType::Gauge,
                metric: vec![Metric {
                    gauge: Some(Gauge { value: 1.0 }),
                    ..Default::default()
                }],
            }])
        });

        let resp = prometheus_metrics(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("version=0.0.4"));
        assert_eq!(body_text(resp).await, "# TYPE up gauge\nup 1\n");
    }

    #[tokio::test]
    async fn gather_failure_is_server_error() {
        let state = test_state(|| Err(GatherError::Timeout(std::time::Duration::from_secs(30))));

        let resp = prometheus_metrics(State(state)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(resp).await;
        assert!(body.starts_with("An error has occurred while serving metrics:"));
        assert!(body.contains("timed out"));
    }

    #[tokio::test]
    async fn unencodable_family_is_server_error() {
        let state = test_state(|| {
            Ok(vec![MetricFamily {
                name: "empty".to_string(),
                ..Default::default()
            }])
        });

        let resp = prometheus_metrics(State(state)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("empty has no metrics"));
    }
}
