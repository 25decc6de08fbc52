//! 网络发现 handler：请求参数缺省时取服务端配置

use crate::AppState;
use crate::utils::response::{discovery_error, discovery_to_dto, port_profile_from_dto};
use api_contract::{ApiResponse, DiscoverRequest, DiscoveryResultDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_config::DiscoveryDefaults;
use iot_discovery::DiscoveryOptions;

fn merge_options(req: DiscoverRequest, defaults: &DiscoveryDefaults) -> DiscoveryOptions {
    DiscoveryOptions {
        subnet: req
            .subnet
            .map(|subnet| subnet.trim().to_string())
            .unwrap_or_else(|| defaults.subnet.clone()),
        start_host: req.start_host.unwrap_or(defaults.start_host),
        end_host: req.end_host.unwrap_or(defaults.end_host),
        timeout_ms: req.timeout_ms.unwrap_or(defaults.timeout_ms),
        batch_size: req.batch_size.unwrap_or(defaults.batch_size),
        ports: req
            .ports
            .map(|ports| ports.into_iter().map(port_profile_from_dto).collect()),
    }
}

/// 请求体可省略，省略时全部使用默认参数
pub async fn discover(
    State(state): State<AppState>,
    req: Option<Json<DiscoverRequest>>,
) -> Response {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let options = merge_options(req, &state.discovery_defaults);
    match state.discoverer.discover(options).await {
        Ok(results) => {
            let results: Vec<DiscoveryResultDto> =
                results.into_iter().map(discovery_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(results))).into_response()
        }
        Err(err) => discovery_error(err),
    }
}
