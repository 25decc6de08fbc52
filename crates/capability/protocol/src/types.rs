//! 协议相关类型定义

use crate::error::ProtocolError;
use domain::Credentials;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 可通过 invoke 调用的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// 发送原始数据
    Send,
    /// 接收一帧数据
    Receive,
    /// 订阅主题
    Subscribe,
    /// 发布消息
    Publish,
    /// 请求/响应
    Request,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Send,
        Self::Receive,
        Self::Subscribe,
        Self::Publish,
        Self::Request,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Subscribe => "subscribe",
            Self::Publish => "publish",
            Self::Request => "request",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| ProtocolError::Unsupported(value.to_string()))
    }
}

/// 适配器能力集
///
/// 连接是每个适配器的必备能力，其余能力需显式声明，
/// 调用方在分派前通过 `supports` 检查。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub disconnect: bool,
    pub send: bool,
    pub receive: bool,
    pub subscribe: bool,
    pub publish: bool,
    pub request: bool,
}

impl CapabilitySet {
    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Send => self.send,
            Operation::Receive => self.receive,
            Operation::Subscribe => self.subscribe,
            Operation::Publish => self.publish,
            Operation::Request => self.request,
        }
    }

    /// 已声明的操作列表
    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

/// 协议描述（注册后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub default_port: Option<u16>,
    pub secure_port: Option<u16>,
    pub capabilities: CapabilitySet,
}

/// 连接目标
#[derive(Debug, Clone, Default)]
pub struct ConnectTarget {
    pub host: String,
    pub port: Option<u16>,
    pub credentials: Credentials,
}

impl ConnectTarget {
    /// 端口缺失时报错
    pub fn require_port(&self) -> Result<u16, ProtocolError> {
        self.port
            .ok_or_else(|| ProtocolError::InvalidArgs(format!("port required for {}", self.host)))
    }

    pub fn credential_str(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).and_then(|value| value.as_str())
    }

    pub fn credential_u64(&self, key: &str) -> Option<u64> {
        self.credentials.get(key).and_then(|value| value.as_u64())
    }
}

/// Modbus 寄存器数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModbusDataType {
    /// 16位有符号整数
    Int16,
    /// 16位无符号整数
    Uint16,
    /// 32位有符号整数（2个寄存器）
    Int32,
    /// 32位无符号整数（2个寄存器）
    Uint32,
    /// 32位浮点数（2个寄存器）
    Float32,
    /// 64位浮点数（4个寄存器）
    Float64,
}

impl Default for ModbusDataType {
    fn default() -> Self {
        Self::Int16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation() {
        assert_eq!("send".parse::<Operation>().unwrap(), Operation::Send);
        assert_eq!(" Request ".parse::<Operation>().unwrap(), Operation::Request);
        assert!("readCoils".parse::<Operation>().is_err());
    }

    #[test]
    fn test_capability_operations() {
        let caps = CapabilitySet {
            disconnect: true,
            send: true,
            receive: true,
            ..CapabilitySet::default()
        };
        assert!(caps.supports(Operation::Send));
        assert!(!caps.supports(Operation::Publish));
        assert_eq!(caps.operations(), vec![Operation::Send, Operation::Receive]);
    }
}
