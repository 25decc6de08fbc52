//! 原始 UDP 适配器
//!
//! 绑定本地临时端口并 connect 到设备地址，之后只收发该对端的数据报。

use crate::adapter::{Connection, ProtocolAdapter};
use crate::args::{bytes_to_value, first_payload, optional_u64};
use crate::error::ProtocolError;
use crate::types::{CapabilitySet, ConnectTarget, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::UdpSocket;

/// 单个数据报上限
const MAX_DATAGRAM: usize = 65_507;

/// UDP 适配器
pub struct UdpAdapter {
    descriptor: ProtocolDescriptor,
}

impl UdpAdapter {
    pub fn new() -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: "udp".to_string(),
                display_name: "Raw UDP".to_string(),
                description: "Raw UDP socket connection".to_string(),
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

impl Default for UdpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolAdapter for UdpAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        let port = target.require_port()?;
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .connect((target.host.as_str(), port))
            .await
            .map_err(|e| ProtocolError::Connection(format!("{}:{}: {}", target.host, port, e)))?;
        Ok(Box::new(UdpConnection { socket }))
    }
}

/// UDP 连接句柄
pub struct UdpConnection {
    socket: UdpSocket,
}

#[async_trait]
impl Connection for UdpConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Send => {
                let payload = first_payload(&args)?;
                let n = self.socket.send(&payload).await?;
                Ok(json!({ "bytesWritten": n }))
            }
            Operation::Receive => {
                let max = optional_u64(&args, 0)
                    .map(|value| (value as usize).min(MAX_DATAGRAM))
                    .filter(|value| *value > 0)
                    .unwrap_or(MAX_DATAGRAM);
                let mut buf = vec![0u8; max];
                let n = self.socket.recv(&mut buf).await?;
                Ok(bytes_to_value(&buf[..n]))
            }
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_datagram_roundtrip() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = peer.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, from) = peer.recv_from(&mut buf).await.unwrap();
            peer.send_to(&buf[..n], from).await.unwrap();
        });

        let adapter = UdpAdapter::new();
        let target = ConnectTarget {
            host: "127.0.0.1".to_string(),
            port: Some(port),
            ..ConnectTarget::default()
        };
        let mut conn = adapter.connect(&target).await.unwrap();
        conn.invoke(Operation::Send, vec![json!("ping")])
            .await
            .unwrap();
        let reply = conn.invoke(Operation::Receive, vec![]).await.unwrap();
        assert_eq!(reply, json!("ping"));
    }
}
