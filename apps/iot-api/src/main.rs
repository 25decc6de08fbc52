//! IoT 设备管理 HTTP 服务：协议列表、设备生命周期、API 设备、网络发现与指标。

mod events;
mod handlers;
mod routes;
mod utils;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use iot_config::{AppConfig, DiscoveryDefaults};
use iot_device::{DeviceManager, ManagerConfig};
use iot_discovery::{Discoverer, TcpProber, parse_port_table};
use iot_protocol::ProtocolRegistry;
use iot_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DeviceManager>,
    pub discoverer: Arc<Discoverer>,
    /// 请求未指定时使用的扫描参数
    pub discovery_defaults: DiscoveryDefaults,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 协议注册表：启动时一次性注册，之后只读
    let protocols = if config.builtin_adapters {
        ProtocolRegistry::with_builtin_adapters()
    } else {
        ProtocolRegistry::new()
    };
    let manager = Arc::new(DeviceManager::new_with_config(
        Arc::new(protocols),
        ManagerConfig {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            invoke_timeout: Duration::from_millis(config.invoke_timeout_ms),
            disconnect_timeout: Duration::from_millis(config.disconnect_timeout_ms),
            event_capacity: config.event_capacity,
        },
    ));

    // 发现扫描器与设备管理器共用同一条事件总线
    let mut discoverer = Discoverer::new(Arc::new(TcpProber), manager.events().clone());
    if let Some(raw) = &config.discovery.ports {
        discoverer = discoverer.with_ports(parse_port_table(raw)?);
    }

    let event_logger = events::spawn_event_logger(manager.subscribe());
    let state = AppState {
        manager,
        discoverer: Arc::new(discoverer),
        discovery_defaults: config.discovery.clone(),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "iot.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    event_logger.abort();
    Ok(())
}

/// 组装路由：同时挂载在 / 与 /api 下，并注入 request_id/trace_id
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(middleware::from_fn(request_context))
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}


#[cfg(test)]
mod tests {
    use super::build_app;
    use super::test_support::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn routes_served_with_and_without_api_prefix() {
        let app = build_app(test_state());
        for path in ["/iot/protocols", "/api/iot/protocols"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-request-id"));
            assert!(response.headers().contains_key("x-trace-id"));
            let body = body_json(response).await;
            assert_eq!(body["success"], true);
            assert_eq!(body["data"][0]["id"], "tcp");
        }
    }

    #[tokio::test]
    async fn unknown_device_is_not_found_envelope() {
        let app = build_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/iot/devices/ghost/connect")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "DEVICE.NOT_FOUND");
    }
}
