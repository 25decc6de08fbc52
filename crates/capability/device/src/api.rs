//! REST API 设备
//!
//! API 设备是类型为 `api` 的 http 设备：凭据携带基础地址、请求头与认证，
//! 元数据携带端点列表与文档链接。调用时若未连接会先自动连接。

use crate::error::DeviceError;
use crate::manager::DeviceManager;
use domain::{Credentials, Device, DeviceConfig, DeviceStatus, Metadata};
use iot_protocol::parse_base_url;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// API 设备类型标签
pub const API_DEVICE_TYPE: &str = "api";

/// API 设备绑定的协议
pub const API_PROTOCOL_ID: &str = "http";

/// API 注册配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub base_url: String,
    /// 缺省取基础地址中的主机
    #[serde(default)]
    pub host: Option<String>,
    /// 缺省按基础地址推断（https 为 443）
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default)]
    pub auth: Option<Value>,
    #[serde(default)]
    pub endpoints: Vec<Value>,
    #[serde(default)]
    pub documentation: Option<String>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn into_device_config(self) -> Result<DeviceConfig, DeviceError> {
        let (parsed_host, parsed_port) = parse_base_url(&self.base_url)
            .map_err(|err| DeviceError::InvalidConfig(err.to_string()))?;

        let mut credentials = Credentials::new();
        credentials.insert("baseUrl".to_string(), Value::String(self.base_url));
        credentials.insert("headers".to_string(), Value::Object(self.headers));
        if let Some(auth) = self.auth {
            credentials.insert("auth".to_string(), auth);
        }
        let mut metadata = Metadata::new();
        metadata.insert("endpoints".to_string(), Value::Array(self.endpoints));
        if let Some(documentation) = self.documentation {
            metadata.insert("documentation".to_string(), Value::String(documentation));
        }

        Ok(DeviceConfig {
            name: self.name,
            device_type: Some(API_DEVICE_TYPE.to_string()),
            protocol_id: API_PROTOCOL_ID.to_string(),
            host: self.host.unwrap_or(parsed_host),
            port: Some(self.port.unwrap_or(parsed_port)),
            credentials,
            metadata,
        })
    }
}

/// 构造一次 request 调用参数；GET 的对象数据作为查询参数，DELETE 不带数据
fn api_request(method: &str, endpoint: &str, data: Option<Value>) -> Value {
    let mut request = json!({ "method": method, "path": endpoint });
    match (method, data) {
        (_, None) | (_, Some(Value::Null)) | ("DELETE", _) => {}
        ("GET", Some(Value::Object(query))) => {
            request["query"] = Value::Object(query);
        }
        ("GET", Some(_)) => {}
        (_, Some(body)) => {
            request["body"] = body;
        }
    }
    request
}

impl DeviceManager {
    /// 注册 REST API 设备
    pub async fn register_api(&self, id: &str, config: ApiConfig) -> Result<Device, DeviceError> {
        let config = config.into_device_config()?;
        self.register_device(id, config).await
    }

    /// 调用 API 设备的一个端点
    pub async fn call_api(
        &self,
        id: &str,
        endpoint: &str,
        method: &str,
        data: Option<Value>,
    ) -> Result<Value, DeviceError> {
        let device = self
            .get_device(id)
            .ok()
            .filter(|device| device.device_type == API_DEVICE_TYPE)
            .ok_or_else(|| DeviceError::DeviceNotFound(id.to_string()))?;
        let method = method.trim().to_ascii_uppercase();
        if !matches!(method.as_str(), "GET" | "POST" | "PUT" | "DELETE") {
            return Err(DeviceError::OperationNotSupported {
                device_id: device.id,
                protocol_id: device.protocol_id,
                operation: method,
            });
        }
        if device.status != DeviceStatus::Connected {
            self.connect_device(id).await?;
        }
        let request = api_request(&method, endpoint, data);
        self.invoke(id, "request", vec![request]).await
    }
}
