use crate::AppState;
use crate::utils::response::protocol_to_dto;
use api_contract::{ApiResponse, ProtocolDto};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse, response::Response};

/// 已注册协议，按注册顺序
pub async fn list_protocols(State(state): State<AppState>) -> Response {
    let protocols: Vec<ProtocolDto> = state
        .manager
        .list_protocols()
        .into_iter()
        .map(protocol_to_dto)
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(protocols))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, test_state};

    #[tokio::test]
    async fn builtin_protocols_listed_in_order() {
        let response = list_protocols(State(test_state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["tcp", "udp", "modbus", "mqtt", "http"]);
        assert_eq!(body["data"][2]["defaultPort"], 502);
        assert_eq!(body["data"][4]["supportsDisconnect"], false);
        assert_eq!(body["data"][4]["operations"][0], "request");
    }
}
