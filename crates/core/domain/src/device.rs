//! 设备模型定义
//!
//! `Device` 是注册表内部记录的完整快照（不含连接句柄），
//! `DeviceSummary` 是对外列表投影（不含凭据与元数据）。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 凭据（由协议适配器解释的不透明键值）
pub type Credentials = Map<String, Value>;

/// 元数据（描述性信息，不参与连接）
pub type Metadata = Map<String, Value>;

/// 设备连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Disconnected,
    Connected,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备注册配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// 显示名称（缺省为设备 ID）
    #[serde(default)]
    pub name: Option<String>,
    /// 分类标签（缺省为 generic）
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    /// 协议 ID（必须已注册）
    #[serde(alias = "protocol")]
    pub protocol_id: String,
    #[serde(default)]
    pub host: String,
    /// 端口（缺省取协议默认端口）
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DeviceConfig {
    pub fn new(protocol_id: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

/// 设备快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub protocol_id: String,
    pub host: String,
    pub port: Option<u16>,
    pub credentials: Credentials,
    pub metadata: Metadata,
    pub status: DeviceStatus,
    /// 最近一次成功交互时间（毫秒）
    pub last_seen_ms: Option<i64>,
}

impl Device {
    /// 由注册配置构造断开状态的设备，`default_port` 用于补全缺省端口。
    pub fn from_config(id: &str, config: DeviceConfig, default_port: Option<u16>) -> Self {
        let name = config
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.to_string());
        let device_type = config
            .device_type
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "generic".to_string());
        Self {
            id: id.to_string(),
            name,
            device_type,
            protocol_id: config.protocol_id,
            host: config.host,
            port: config.port.or(default_port),
            credentials: config.credentials,
            metadata: config.metadata,
            status: DeviceStatus::Disconnected,
            last_seen_ms: None,
        }
    }

    /// 记录一次成功交互；时间戳只增不减。
    pub fn touch(&mut self, now_ms: i64) {
        self.last_seen_ms = Some(match self.last_seen_ms {
            Some(previous) => previous.max(now_ms),
            None => now_ms,
        });
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            device_type: self.device_type.clone(),
            protocol_id: self.protocol_id.clone(),
            host: self.host.clone(),
            port: self.port,
            status: self.status,
            last_seen_ms: self.last_seen_ms,
        }
    }
}

/// 设备列表投影
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub protocol_id: String,
    pub host: String,
    pub port: Option<u16>,
    pub status: DeviceStatus,
    pub last_seen_ms: Option<i64>,
}
