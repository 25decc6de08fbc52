//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 事件总线缓冲上限
pub const MAX_EVENT_CAPACITY: u64 = 65_536;

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub connect_timeout_ms: u64,
    pub invoke_timeout_ms: u64,
    pub disconnect_timeout_ms: u64,
    pub event_capacity: usize,
    /// 启动时注册内置协议适配器
    pub builtin_adapters: bool,
    pub discovery: DiscoveryDefaults,
}

/// 发现扫描的默认参数（请求未指定时使用）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDefaults {
    pub subnet: String,
    pub start_host: u16,
    pub end_host: u16,
    pub timeout_ms: u64,
    pub batch_size: usize,
    /// 端口表覆盖，格式 `port:protocol:Display Name`，逗号分隔
    pub ports: Option<String>,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("IOT_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let connect_timeout_ms = read_positive_u64("IOT_CONNECT_TIMEOUT_MS", 10_000)?;
        let invoke_timeout_ms = read_positive_u64("IOT_INVOKE_TIMEOUT_MS", 10_000)?;
        let disconnect_timeout_ms = read_positive_u64("IOT_DISCONNECT_TIMEOUT_MS", 5_000)?;
        let event_capacity = read_bounded_u64("IOT_EVENT_CAPACITY", 256, MAX_EVENT_CAPACITY)? as usize;
        let builtin_adapters = read_bool_with_default("IOT_BUILTIN_ADAPTERS", true);

        let subnet =
            env::var("IOT_DISCOVERY_SUBNET").unwrap_or_else(|_| "192.168.1".to_string());
        let start_host = read_u16_with_default("IOT_DISCOVERY_START_HOST", 1)?;
        let end_host = read_u16_with_default("IOT_DISCOVERY_END_HOST", 254)?;
        let timeout_ms = read_positive_u64("IOT_DISCOVERY_TIMEOUT_MS", 500)?;
        let batch_size = read_positive_u64("IOT_DISCOVERY_BATCH_SIZE", 10)? as usize;
        let ports = read_optional("IOT_DISCOVERY_PORTS");

        Ok(Self {
            http_addr,
            connect_timeout_ms,
            invoke_timeout_ms,
            disconnect_timeout_ms,
            event_capacity,
            builtin_adapters,
            discovery: DiscoveryDefaults {
                subnet,
                start_host,
                end_host,
                timeout_ms,
                batch_size,
                ports,
            },
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取正整数；0 视为非法。
fn read_positive_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match read_u64_with_default(key, default)? {
        0 => Err(ConfigError::Invalid(key.to_string(), "0".to_string())),
        value => Ok(value),
    }
}

/// 读取 1..=max 范围内的整数。
fn read_bounded_u64(key: &str, default: u64, max: u64) -> Result<u64, ConfigError> {
    match read_positive_u64(key, default)? {
        value if value > max => Err(ConfigError::Invalid(key.to_string(), value.to_string())),
        value => Ok(value),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
