//! 端口/协议表与扫描参数

use crate::error::DiscoveryError;
use serde::{Deserialize, Serialize};

/// 端口与协议的对应关系
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortProfile {
    pub port: u16,
    #[serde(alias = "protocol")]
    pub protocol_id: String,
    #[serde(alias = "name")]
    pub display_name: String,
}

impl PortProfile {
    pub fn new(port: u16, protocol_id: &str, display_name: &str) -> Self {
        Self {
            port,
            protocol_id: protocol_id.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// 常见 IoT 端口表
pub fn default_port_table() -> Vec<PortProfile> {
    vec![
        PortProfile::new(1883, "mqtt", "MQTT"),
        PortProfile::new(8883, "mqtt", "MQTT (TLS)"),
        PortProfile::new(5683, "coap", "CoAP"),
        PortProfile::new(502, "modbus", "Modbus"),
        PortProfile::new(80, "http", "HTTP"),
        PortProfile::new(443, "http", "HTTPS"),
        PortProfile::new(8080, "http", "HTTP Alt"),
        PortProfile::new(8443, "http", "HTTPS Alt"),
    ]
}

/// 解析端口表配置，格式：`port:protocol:Display Name`，逗号分隔
///
/// 显示名称可省略，缺省为协议 ID 的大写形式。
pub fn parse_port_table(raw: &str) -> Result<Vec<PortProfile>, DiscoveryError> {
    let mut profiles = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let mut parts = entry.splitn(3, ':').map(str::trim);
        let port = parts
            .next()
            .and_then(|value| value.parse::<u16>().ok())
            .filter(|port| *port > 0)
            .ok_or_else(|| DiscoveryError::InvalidOptions(format!("invalid port entry: {}", entry)))?;
        let protocol_id = parts
            .next()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                DiscoveryError::InvalidOptions(format!("missing protocol in entry: {}", entry))
            })?;
        let display_name = parts
            .next()
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| protocol_id.to_ascii_uppercase());
        profiles.push(PortProfile {
            port,
            protocol_id: protocol_id.to_string(),
            display_name,
        });
    }
    if profiles.is_empty() {
        return Err(DiscoveryError::InvalidOptions("empty port table".to_string()));
    }
    Ok(profiles)
}

/// 扫描参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryOptions {
    /// 前三段地址，如 `192.168.1`
    pub subnet: String,
    pub start_host: u16,
    pub end_host: u16,
    pub timeout_ms: u64,
    pub batch_size: usize,
    /// 覆盖扫描器的端口表
    pub ports: Option<Vec<PortProfile>>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            subnet: "192.168.1".to_string(),
            start_host: 1,
            end_host: 254,
            timeout_ms: 500,
            batch_size: 10,
            ports: None,
        }
    }
}

impl DiscoveryOptions {
    /// 扫描主机数
    pub fn host_count(&self) -> u32 {
        u32::from(self.end_host.saturating_sub(self.start_host)) + 1
    }

    pub fn validate(&self, ports: &[PortProfile]) -> Result<(), DiscoveryError> {
        let octets: Vec<&str> = self.subnet.trim().split('.').collect();
        if octets.len() != 3 || octets.iter().any(|octet| octet.parse::<u8>().is_err()) {
            return Err(DiscoveryError::InvalidOptions(format!(
                "subnet must be three octets, got '{}'",
                self.subnet
            )));
        }
        if self.start_host > 255 || self.end_host > 255 {
            return Err(DiscoveryError::InvalidOptions(
                "host numbers must be within 0-255".to_string(),
            ));
        }
        if self.start_host > self.end_host {
            return Err(DiscoveryError::InvalidOptions(format!(
                "startHost {} is after endHost {}",
                self.start_host, self.end_host
            )));
        }
        if self.batch_size == 0 {
            return Err(DiscoveryError::InvalidOptions("batchSize must be positive".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(DiscoveryError::InvalidOptions("timeoutMs must be positive".to_string()));
        }
        if ports.is_empty() {
            return Err(DiscoveryError::InvalidOptions("empty port table".to_string()));
        }
        if ports.iter().any(|profile| profile.port == 0) {
            return Err(DiscoveryError::InvalidOptions("port 0 cannot be probed".to_string()));
        }
        Ok(())
    }
}
