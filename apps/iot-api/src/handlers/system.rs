//! 健康检查与运行指标

use crate::AppState;
use api_contract::ApiResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use iot_telemetry::metrics;
use serde_json::json;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "devices": state.manager.list_devices().len(),
        "protocols": state.manager.list_protocols().len(),
    });
    (StatusCode::OK, Json(ApiResponse::success(body)))
}

pub async fn get_metrics() -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(metrics().snapshot())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, test_state};

    #[tokio::test]
    async fn health_reports_protocol_count() {
        let response = health(State(test_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["protocols"], 5);
    }

    #[tokio::test]
    async fn metrics_snapshot_is_camel_case() {
        let body = body_json(get_metrics().await.into_response()).await;
        assert!(body["data"]["connectSuccess"].is_u64());
        assert!(body["data"]["discoveryRuns"].is_u64());
    }
}
