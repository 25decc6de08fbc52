//! 协议错误类型定义

/// 协议通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Modbus 错误
    #[error("modbus error: {0}")]
    Modbus(String),

    /// Modbus 异常应答（连接仍可用）
    #[error("modbus exception: {0}")]
    ModbusException(String),

    /// MQTT 错误
    #[error("mqtt error: {0}")]
    Mqtt(String),

    /// HTTP 错误
    #[error("http error: {0}")]
    Http(String),

    /// HTTP 非 2xx 响应（连接仍可用）
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// 调用参数错误
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),

    /// 等待数据超时，连接本身仍可用
    #[error("no data: {0}")]
    NoData(String),

    /// 适配器未实现该操作
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// 通道关闭
    #[error("channel closed")]
    ChannelClosed,
}

impl ProtocolError {
    /// 是否为传输层故障（连接已不可用）
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Io(_)
                | Self::Modbus(_)
                | Self::Mqtt(_)
                | Self::Http(_)
                | Self::Timeout(_)
                | Self::ChannelClosed
        )
    }
}

impl From<rumqttc::ClientError> for ProtocolError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Mqtt(err.to_string())
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
