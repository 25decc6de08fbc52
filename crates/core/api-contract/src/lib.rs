//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 协议返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDto {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub default_port: Option<u16>,
    pub secure_port: Option<u16>,
    /// 可通过 invoke 调用的操作
    pub operations: Vec<String>,
    pub supports_disconnect: bool,
}

/// 设备注册请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    #[serde(alias = "deviceId")]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    #[serde(alias = "protocol")]
    pub protocol_id: String,
    #[serde(default)]
    pub host: String,
    pub port: Option<u16>,
    pub credentials: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
}

/// 设备列表项（不含凭据与元数据）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummaryDto {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub protocol_id: String,
    pub host: String,
    pub port: Option<u16>,
    pub status: String,
    pub last_seen_ms: Option<i64>,
}

/// 设备详情（不含凭据）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub protocol_id: String,
    pub host: String,
    pub port: Option<u16>,
    pub status: String,
    pub last_seen_ms: Option<i64>,
    pub metadata: Map<String, Value>,
}

/// 设备调用请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    #[serde(alias = "op")]
    pub operation: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// 设备调用结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResultDto {
    pub device_id: String,
    pub operation: String,
    pub result: Value,
}

/// 端口表项。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortProfileDto {
    pub port: u16,
    #[serde(alias = "protocol")]
    pub protocol_id: String,
    #[serde(alias = "name")]
    pub display_name: String,
}

/// 发现扫描请求体（缺省字段取服务端配置）。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest {
    pub subnet: Option<String>,
    pub start_host: Option<u16>,
    pub end_host: Option<u16>,
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub ports: Option<Vec<PortProfileDto>>,
}

/// 发现结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResultDto {
    pub host: String,
    pub port: u16,
    pub protocol_id: String,
    pub display_name: String,
    pub discovered_at_ms: i64,
}

/// API 设备注册请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterApiRequest {
    #[serde(alias = "deviceId")]
    pub id: String,
    pub name: Option<String>,
    pub base_url: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub headers: Option<Map<String, Value>>,
    pub auth: Option<Value>,
    pub endpoints: Option<Vec<Value>>,
    pub documentation: Option<String>,
}

/// API 调用请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallApiRequest {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}
