//! 追踪、请求 ID 生成与基础指标。

use serde::Serialize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub devices_registered: u64,
    pub devices_removed: u64,
    pub connect_success: u64,
    pub connect_failure: u64,
    pub disconnects: u64,
    pub invocation_success: u64,
    pub invocation_failure: u64,
    pub invocation_latency_ms_total: u64,
    pub invocation_latency_ms_count: u64,
    pub discovery_runs: u64,
    pub probes: u64,
    pub endpoints_found: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    devices_registered: AtomicU64,
    devices_removed: AtomicU64,
    connect_success: AtomicU64,
    connect_failure: AtomicU64,
    disconnects: AtomicU64,
    invocation_success: AtomicU64,
    invocation_failure: AtomicU64,
    invocation_latency_ms_total: AtomicU64,
    invocation_latency_ms_count: AtomicU64,
    discovery_runs: AtomicU64,
    probes: AtomicU64,
    endpoints_found: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            devices_registered: AtomicU64::new(0),
            devices_removed: AtomicU64::new(0),
            connect_success: AtomicU64::new(0),
            connect_failure: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            invocation_success: AtomicU64::new(0),
            invocation_failure: AtomicU64::new(0),
            invocation_latency_ms_total: AtomicU64::new(0),
            invocation_latency_ms_count: AtomicU64::new(0),
            discovery_runs: AtomicU64::new(0),
            probes: AtomicU64::new(0),
            endpoints_found: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            devices_registered: self.devices_registered.load(Ordering::Relaxed),
            devices_removed: self.devices_removed.load(Ordering::Relaxed),
            connect_success: self.connect_success.load(Ordering::Relaxed),
            connect_failure: self.connect_failure.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            invocation_success: self.invocation_success.load(Ordering::Relaxed),
            invocation_failure: self.invocation_failure.load(Ordering::Relaxed),
            invocation_latency_ms_total: self
                .invocation_latency_ms_total
                .load(Ordering::Relaxed),
            invocation_latency_ms_count: self
                .invocation_latency_ms_count
                .load(Ordering::Relaxed),
            discovery_runs: self.discovery_runs.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
            endpoints_found: self.endpoints_found.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录设备注册次数。
pub fn record_device_registered() {
    metrics().devices_registered.fetch_add(1, Ordering::Relaxed);
}

/// 记录设备移除次数。
pub fn record_device_removed() {
    metrics().devices_removed.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接成功次数。
pub fn record_connect_success() {
    metrics().connect_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接失败次数（含超时）。
pub fn record_connect_failure() {
    metrics().connect_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录断开次数。
pub fn record_disconnect() {
    metrics().disconnects.fetch_add(1, Ordering::Relaxed);
}

/// 记录调用成功次数。
pub fn record_invocation_success() {
    metrics().invocation_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录调用失败次数。
pub fn record_invocation_failure() {
    metrics().invocation_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录调用耗时（毫秒）。
pub fn record_invocation_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .invocation_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .invocation_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录发现扫描次数。
pub fn record_discovery_run() {
    metrics().discovery_runs.fetch_add(1, Ordering::Relaxed);
}

/// 记录端口探测次数。
pub fn record_probes(count: u64) {
    metrics().probes.fetch_add(count, Ordering::Relaxed);
}

/// 记录发现的端点数。
pub fn record_endpoints_found(count: u64) {
    metrics().endpoints_found.fetch_add(count, Ordering::Relaxed);
}
