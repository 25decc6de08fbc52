//! 协议适配器抽象
//!
//! 适配器负责建立连接并返回不透明的连接句柄；
//! 句柄只由生命周期管理器持有，所有操作都通过它分派。

use crate::error::ProtocolError;
use crate::types::{ConnectTarget, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use serde_json::Value;

/// 协议适配器
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// 协议描述与能力集
    fn descriptor(&self) -> &ProtocolDescriptor;

    /// 建立连接
    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError>;
}

/// 活动连接句柄
#[async_trait]
pub trait Connection: Send {
    /// 执行一次操作，结果原样返回给调用方
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>)
    -> Result<Value, ProtocolError>;

    /// 关闭连接（仅在适配器声明 disconnect 能力时调用）
    async fn close(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
}
