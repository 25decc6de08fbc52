//! 网络发现结果

use serde::{Deserialize, Serialize};

/// 单个响应端点（不持久化，也不会自动注册为设备）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub host: String,
    pub port: u16,
    pub protocol_id: String,
    pub display_name: String,
    pub discovered_at_ms: i64,
}

/// 批次完成后的扫描进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryProgress {
    pub scanned: u32,
    pub total: u32,
    pub found: usize,
}
