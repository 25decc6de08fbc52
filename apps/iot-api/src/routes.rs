//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查与指标：/health, /metrics
//! - 协议：/iot/protocols
//! - 设备生命周期：/iot/devices/*
//! - 网络发现：/iot/discover
//! - REST API 设备：/iot/api/*

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

/// 创建 API 路由
///
/// 返回包含所有 API 端点的 Router，由调用方挂载到 / 和 /api/ 两种前缀
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/iot/protocols", get(list_protocols))
        .route("/iot/devices", get(list_devices).post(register_device))
        .route(
            "/iot/devices/:device_id",
            get(get_device).delete(remove_device),
        )
        .route("/iot/devices/:device_id/connect", post(connect_device))
        .route("/iot/devices/:device_id/disconnect", post(disconnect_device))
        .route("/iot/devices/:device_id/invoke", post(invoke_device))
        .route("/iot/discover", post(discover))
        .route("/iot/api", post(register_api))
        .route("/iot/api/:device_id/call", post(call_api))
}
