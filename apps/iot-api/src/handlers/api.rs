//! REST API 设备 handlers

use crate::AppState;
use crate::utils::normalize_required;
use crate::utils::response::{device_error, device_to_dto};
use api_contract::{ApiResponse, CallApiRequest, RegisterApiRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_device::ApiConfig;

#[derive(serde::Deserialize)]
pub struct ApiDevicePath {
    device_id: String,
}

pub async fn register_api(
    State(state): State<AppState>,
    Json(req): Json<RegisterApiRequest>,
) -> Response {
    let id = match normalize_required(req.id, "id") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let base_url = match normalize_required(req.base_url, "baseUrl") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let config = ApiConfig {
        name: req.name,
        host: req.host,
        port: req.port,
        headers: req.headers.unwrap_or_default(),
        auth: req.auth,
        endpoints: req.endpoints.unwrap_or_default(),
        documentation: req.documentation,
        ..ApiConfig::new(base_url)
    };
    match state.manager.register_api(&id, config).await {
        Ok(device) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(device_to_dto(device))),
        )
            .into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn call_api(
    State(state): State<AppState>,
    Path(path): Path<ApiDevicePath>,
    Json(req): Json<CallApiRequest>,
) -> Response {
    match state
        .manager
        .call_api(&path.device_id, &req.endpoint, &req.method, req.data)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))).into_response(),
        Err(err) => device_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, test_state};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn register_request(id: &str, base_url: &str) -> RegisterApiRequest {
        serde_json::from_value(json!({
            "id": id,
            "baseUrl": base_url,
            "headers": {"x-api-key": "k"},
            "endpoints": [{"path": "/status", "method": "GET"}],
        }))
        .unwrap()
    }

    fn path(id: &str) -> Path<ApiDevicePath> {
        Path(ApiDevicePath {
            device_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn register_api_derives_host_and_port() {
        let state = test_state();
        let response = register_api(
            State(state),
            Json(register_request("weather", "https://api.example.com/v1")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["type"], "api");
        assert_eq!(body["data"]["protocolId"], "http");
        assert_eq!(body["data"]["host"], "api.example.com");
        assert_eq!(body["data"]["port"], 443);
        assert_eq!(body["data"]["metadata"]["endpoints"][0]["path"], "/status");
    }

    #[tokio::test]
    async fn call_api_connects_and_returns_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"ok":true}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let state = test_state();
        register_api(
            State(state.clone()),
            Json(register_request("local", &format!("http://127.0.0.1:{port}"))),
        )
        .await;
        let req: CallApiRequest = serde_json::from_value(json!({"endpoint": "/status"})).unwrap();
        let response = call_api(State(state.clone()), path("local"), Json(req)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], json!({"ok": true}));
        assert_eq!(
            state.manager.get_device("local").unwrap().status.as_str(),
            "connected"
        );
    }

    #[tokio::test]
    async fn call_api_rejects_unknown_method_and_plain_devices() {
        let state = test_state();
        register_api(
            State(state.clone()),
            Json(register_request("svc", "http://127.0.0.1:9")),
        )
        .await;
        let req: CallApiRequest =
            serde_json::from_value(json!({"endpoint": "/x", "method": "PATCH"})).unwrap();
        let response = call_api(State(state.clone()), path("svc"), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let req: CallApiRequest = serde_json::from_value(json!({"endpoint": "/x"})).unwrap();
        let response = call_api(State(state), path("missing"), Json(req)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
