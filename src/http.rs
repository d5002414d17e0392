use crate::export::metrics::{AirQualityMetrics, CurrentSnapshot};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpState {
    pub metrics: Arc<AirQualityMetrics>,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_metrics(State(state): State<HttpState>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = state
        .metrics
        .render()
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}

async fn get_current(State(state): State<HttpState>) -> Json<CurrentSnapshot> {
    Json(state.metrics.snapshot())
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(get_metrics))
        .route("/metrics", get(get_metrics))
        .route("/healthz", get(healthz))
        .route("/v1/current", get(get_current))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::clock::Clock;
    use crate::sensor::Reading;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> HttpState {
        let metrics = Arc::new(AirQualityMetrics::new().unwrap());
        metrics.record(&Reading {
            pm25: 11.0,
            pm10: 21.0,
            timestamp: ManualClock::new().now(),
        });
        HttpState { metrics }
    }

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let response = router(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_are_served_on_root_and_metrics() {
        for uri in ["/", "/metrics"] {
            let (status, body) = get_body(uri).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("PM25 11"), "{uri}: {body}");
            assert!(body.contains("pm10_measurements_sum 10"), "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn current_returns_gauge_snapshot() {
        let (status, body) = get_body("/v1/current").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, serde_json::json!({"pm25": 11.0, "pm10": 21.0}));
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(get_body("/healthz").await, (StatusCode::OK, "ok".to_string()));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _) = get_body("/v2/nothing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
