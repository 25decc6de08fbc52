//! 原始 TCP 适配器
//!
//! 主动连接设备端口，按调用收发原始字节。
//!
//! ## 调用示例
//!
//! ```json
//! // send：字符串或字节数组
//! ["PING\n"]
//! // receive：可选最大读取字节数（默认 4096，上限 64 KiB）
//! [1024]
//! ```

use crate::adapter::{Connection, ProtocolAdapter};
use crate::args::{bytes_to_value, first_payload, optional_u64};
use crate::error::ProtocolError;
use crate::types::{CapabilitySet, ConnectTarget, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// 单次读取默认上限
const DEFAULT_READ_BYTES: usize = 4096;
/// 单次读取硬上限
const MAX_READ_BYTES: usize = 64 * 1024;

/// 本次读取的缓冲大小：缺省或 0 取默认值，超出上限截断
fn read_len(args: &[Value]) -> usize {
    optional_u64(args, 0)
        .filter(|value| *value > 0)
        .map(|value| value.min(MAX_READ_BYTES as u64) as usize)
        .unwrap_or(DEFAULT_READ_BYTES)
}

/// TCP 适配器
pub struct TcpAdapter {
    descriptor: ProtocolDescriptor,
}

impl TcpAdapter {
    pub fn new() -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: "tcp".to_string(),
                display_name: "Raw TCP".to_string(),
                description: "Raw TCP socket connection".to_string(),
                default_port: None,
                secure_port: None,
                capabilities: CapabilitySet {
                    disconnect: true,
                    send: true,
                    receive: true,
                    ..CapabilitySet::default()
                },
            },
        }
    }
}

impl Default for TcpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolAdapter for TcpAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        let port = target.require_port()?;
        let stream = TcpStream::connect((target.host.as_str(), port))
            .await
            .map_err(|e| ProtocolError::Connection(format!("{}:{}: {}", target.host, port, e)))?;
        debug!(host = %target.host, port, "tcp connected");
        Ok(Box::new(TcpConnection { stream }))
    }
}

/// TCP 连接句柄
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    async fn send(&mut self, args: &[Value]) -> Result<Value, ProtocolError> {
        let payload = first_payload(args)?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        Ok(json!({ "bytesWritten": payload.len() }))
    }

    async fn receive(&mut self, args: &[Value]) -> Result<Value, ProtocolError> {
        let mut buf = vec![0u8; read_len(args)];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(ProtocolError::Connection("connection closed".to_string()));
        }
        Ok(bytes_to_value(&buf[..n]))
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Send => self.send(&args).await,
            Operation::Receive => self.receive(&args).await,
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
