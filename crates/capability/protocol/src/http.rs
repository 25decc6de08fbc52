//! HTTP/REST 适配器
//!
//! 连接时只构造带基础地址与默认请求头的客户端，不发起网络请求。
//!
//! ## 调用示例
//!
//! ```json
//! // request：对象形式
//! [{ "method": "POST", "path": "/api/switch", "body": {"on": true} }]
//! // request：位置参数形式 [method, path, body?]
//! ["GET", "/status"]
//! ```
//!
//! 基础地址取凭据 `baseUrl`，缺省为 `http://{host}:{port}`；
//! 凭据 `headers` 对象作为默认请求头，`auth` 支持
//! `{"token": ...}`（Bearer）与 `{"username": ..., "password": ...}`（Basic）。

use crate::adapter::{Connection, ProtocolAdapter};
use crate::error::ProtocolError;
use crate::types::{CapabilitySet, ConnectTarget, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::{Map, Value};

/// HTTP 默认端口
pub const HTTP_DEFAULT_PORT: u16 = 80;
/// HTTPS 端口
pub const HTTP_SECURE_PORT: u16 = 443;

/// HTTP 请求描述
#[derive(Debug, Clone, Deserialize)]
pub struct HttpRequest {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, alias = "endpoint")]
    pub path: String,
    #[serde(default)]
    pub query: Option<Map<String, Value>>,
    #[serde(default, alias = "data")]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpRequest {
    pub fn from_args(args: &[Value]) -> Result<Self, ProtocolError> {
        match args.first() {
            Some(Value::Object(_)) => serde_json::from_value(args[0].clone())
                .map_err(|e| ProtocolError::InvalidArgs(format!("http request: {}", e))),
            Some(Value::String(method)) => Ok(Self {
                method: method.clone(),
                path: args
                    .get(1)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string(),
                query: None,
                body: args.get(2).cloned().filter(|value| !value.is_null()),
            }),
            _ => Err(ProtocolError::InvalidArgs("http request required".to_string())),
        }
    }

    fn method(&self) -> Result<Method, ProtocolError> {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            other => Err(ProtocolError::Unsupported(format!("http method {}", other))),
        }
    }
}

/// HTTP 适配器
pub struct HttpAdapter {
    descriptor: ProtocolDescriptor,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: "http".to_string(),
                display_name: "HTTP/REST".to_string(),
                description: "RESTful API protocol".to_string(),
                default_port: Some(HTTP_DEFAULT_PORT),
                secure_port: Some(HTTP_SECURE_PORT),
                capabilities: CapabilitySet {
                    request: true,
                    ..CapabilitySet::default()
                },
            },
        }
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析基础地址
pub fn base_url(target: &ConnectTarget) -> String {
    match target.credential_str("baseUrl") {
        Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
        _ => format!(
            "http://{}:{}",
            target.host,
            target.port.unwrap_or(HTTP_DEFAULT_PORT)
        ),
    }
}

/// 从基础地址解析主机与端口（端口缺省按 scheme 推断）
pub fn parse_base_url(base_url: &str) -> Result<(String, u16), ProtocolError> {
    let url = Url::parse(base_url)
        .map_err(|e| ProtocolError::InvalidArgs(format!("base url {}: {}", base_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ProtocolError::InvalidArgs(format!("base url {} has no host", base_url)))?
        .to_string();
    let port = url.port_or_known_default().unwrap_or(HTTP_DEFAULT_PORT);
    Ok((host, port))
}

/// 请求认证方式
#[derive(Debug, Clone, PartialEq, Eq)]
enum HttpAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl HttpAuth {
    fn from_target(target: &ConnectTarget) -> Option<Self> {
        let auth = target.credentials.get("auth")?.as_object()?;
        if let Some(token) = auth.get("token").and_then(|value| value.as_str()) {
            return Some(Self::Bearer(token.to_string()));
        }
        let username = auth.get("username").and_then(|value| value.as_str())?;
        let password = auth
            .get("password")
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        Some(Self::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => builder.bearer_auth(token),
            Self::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }
}

fn default_headers(target: &ConnectTarget) -> Result<HeaderMap, ProtocolError> {
    let mut headers = HeaderMap::new();
    let Some(Value::Object(entries)) = target.credentials.get("headers") else {
        return Ok(headers);
    };
    for (name, value) in entries {
        let Some(value) = value.as_str() else {
            continue;
        };
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProtocolError::InvalidArgs(format!("header {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProtocolError::InvalidArgs(format!("header value: {}", e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl ProtocolAdapter for HttpAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        let client = Client::builder()
            .default_headers(default_headers(target)?)
            .build()?;
        Ok(Box::new(HttpConnection {
            client,
            base_url: base_url(target),
            auth: HttpAuth::from_target(target),
        }))
    }
}

/// HTTP 连接句柄
pub struct HttpConnection {
    client: Client,
    base_url: String,
    auth: Option<HttpAuth>,
}

impl HttpConnection {
    fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn execute(&self, request: HttpRequest) -> Result<Value, ProtocolError> {
        let method = request.method()?;
        let mut builder = self.client.request(method, self.url_for(&request.path));
        if let Some(query) = &request.query {
            let pairs: Vec<(String, String)> = query
                .iter()
                .map(|(key, value)| match value {
                    Value::String(text) => (key.clone(), text.clone()),
                    other => (key.clone(), other.to_string()),
                })
                .collect();
            builder = builder.query(&pairs);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(auth) = &self.auth {
            builder = auth.apply(builder);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProtocolError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Request => {
                let request = HttpRequest::from_args(&args)?;
                self.execute(request).await
            }
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }
}
