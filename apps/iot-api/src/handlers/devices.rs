//! 设备生命周期 handlers：注册、查询、连接、断开、调用、移除

use crate::AppState;
use crate::utils::normalize_required;
use crate::utils::response::{device_error, device_to_dto, summary_to_dto};
use api_contract::{ApiResponse, DeviceSummaryDto, InvokeRequest, InvokeResultDto, RegisterDeviceRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::DeviceConfig;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    device_id: String,
}

pub async fn list_devices(State(state): State<AppState>) -> Response {
    let devices: Vec<DeviceSummaryDto> = state
        .manager
        .list_devices()
        .into_iter()
        .map(summary_to_dto)
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(devices))).into_response()
}

pub async fn register_device(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Response {
    let id = match normalize_required(req.id, "id") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let protocol_id = match normalize_required(req.protocol_id, "protocolId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let config = DeviceConfig {
        name: req.name,
        device_type: req.device_type,
        protocol_id,
        host: req.host.trim().to_string(),
        port: req.port,
        credentials: req.credentials.unwrap_or_default(),
        metadata: req.metadata.unwrap_or_default(),
    };
    match state.manager.register_device(&id, config).await {
        Ok(device) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(device_to_dto(device))),
        )
            .into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn get_device(State(state): State<AppState>, Path(path): Path<DevicePath>) -> Response {
    match state.manager.get_device(&path.device_id) {
        Ok(device) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(device))),
        )
            .into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn remove_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
) -> Response {
    match state.manager.remove_device(&path.device_id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn connect_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
) -> Response {
    match state.manager.connect_device(&path.device_id).await {
        Ok(device) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(device))),
        )
            .into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn disconnect_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
) -> Response {
    match state.manager.disconnect_device(&path.device_id).await {
        Ok(device) => (
            StatusCode::OK,
            Json(ApiResponse::success(device_to_dto(device))),
        )
            .into_response(),
        Err(err) => device_error(err),
    }
}

pub async fn invoke_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Json(req): Json<InvokeRequest>,
) -> Response {
    let operation = match normalize_required(req.operation, "operation") {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state
        .manager
        .invoke(&path.device_id, &operation, req.args)
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(ApiResponse::success(InvokeResultDto {
                device_id: path.device_id,
                operation,
                result,
            })),
        )
            .into_response(),
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

    fn register_request(id: &str, protocol: &str, port: Option<u16>) -> RegisterDeviceRequest {
        serde_json::from_value(json!({
            "id": id,
            "protocolId": protocol,
            "host": "127.0.0.1",
            "port": port,
            "credentials": {"password": "secret"},
            "metadata": {"room": "lab"}
        }))
        .unwrap()
    }

    fn path(id: &str) -> Path<DevicePath> {
        Path(DevicePath {
            device_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn register_then_get_hides_credentials() {
        let state = test_state();
        let response = register_device(
            State(state.clone()),
            Json(register_request("plc-1", "modbus", None)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(get_device(State(state.clone()), path("plc-1")).await).await;
        assert_eq!(body["data"]["port"], 502);
        assert_eq!(body["data"]["status"], "disconnected");
        assert_eq!(body["data"]["metadata"]["room"], "lab");
        assert!(body["data"].get("credentials").is_none());

        let list = body_json(list_devices(State(state)).await).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
        assert!(list["data"][0].get("metadata").is_none());
    }

    #[tokio::test]
    async fn register_rejects_blank_id_and_unknown_protocol() {
        let state = test_state();
        let response = register_device(
            State(state.clone()),
            Json(register_request("  ", "tcp", Some(9000))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = register_device(
            State(state.clone()),
            Json(register_request("d1", "zigbee", None)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DEVICE.UNKNOWN_PROTOCOL");
        assert!(state.manager.list_devices().is_empty());
    }

    #[tokio::test]
    async fn invoke_before_connect_is_conflict() {
        let state = test_state();
        register_device(
            State(state.clone()),
            Json(register_request("t1", "tcp", Some(9))),
        )
        .await;
        let response = invoke_device(
            State(state),
            path("t1"),
            Json(InvokeRequest {
                operation: "send".to_string(),
                args: vec![json!("hi")],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DEVICE.NOT_CONNECTED");
    }

    #[tokio::test]
    async fn tcp_device_lifecycle_over_handlers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(&buf[..n]).await.unwrap();
        });

        let state = test_state();
        register_device(
            State(state.clone()),
            Json(register_request("echo", "tcp", Some(port))),
        )
        .await;

        let response = connect_device(State(state.clone()), path("echo")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "connected");

        let response = invoke_device(
            State(state.clone()),
            path("echo"),
            Json(InvokeRequest {
                operation: "send".to_string(),
                args: vec![json!("ping")],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["result"]["bytesWritten"], 4);
        assert_eq!(body["data"]["operation"], "send");

        let response = invoke_device(
            State(state.clone()),
            path("echo"),
            Json(InvokeRequest {
                operation: "publish".to_string(),
                args: vec![json!("topic")],
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = disconnect_device(State(state.clone()), path("echo")).await;
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "disconnected");
        assert!(body["data"]["lastSeenMs"].is_i64());

        let response = remove_device(State(state.clone()), path("echo")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = get_device(State(state), path("echo")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connect_refused_is_bad_gateway() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let state = test_state();
        register_device(
            State(state.clone()),
            Json(register_request("down", "tcp", Some(port))),
        )
        .await;
        let response = connect_device(State(state.clone()), path("down")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(get_device(State(state), path("down")).await).await;
        assert_eq!(body["data"]["status"], "error");
    }
}
