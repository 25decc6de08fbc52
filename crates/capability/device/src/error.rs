//! 设备错误类型定义

/// 设备注册与生命周期错误
///
/// 每个变体都携带足以定位问题的设备 ID、协议 ID 与底层传输信息。
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// 注册时引用了未注册的协议
    #[error("device {device_id}: unknown protocol '{protocol_id}'")]
    UnknownProtocol {
        device_id: String,
        protocol_id: String,
    },

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// 连接时找不到设备绑定的适配器
    #[error("device {device_id}: protocol '{protocol_id}' not supported")]
    ProtocolNotSupported {
        device_id: String,
        protocol_id: String,
    },

    /// 适配器未声明该能力
    #[error("device {device_id}: operation '{operation}' not supported by '{protocol_id}'")]
    OperationNotSupported {
        device_id: String,
        protocol_id: String,
        operation: String,
    },

    /// 连接失败或超时
    #[error("device {device_id}: connect via '{protocol_id}' failed: {message}")]
    ConnectionFailure {
        device_id: String,
        protocol_id: String,
        message: String,
    },

    #[error("device not connected: {0}")]
    DeviceNotConnected(String),

    /// 调用失败（适配器错误原样携带）
    #[error("device {device_id}: {operation} via '{protocol_id}' failed: {message}")]
    InvocationFailure {
        device_id: String,
        protocol_id: String,
        operation: String,
        message: String,
    },

    #[error("invalid device config: {0}")]
    InvalidConfig(String),

    #[error("device registry lock failed")]
    Lock,
}
