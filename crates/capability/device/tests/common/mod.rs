#![allow(dead_code)]

use async_trait::async_trait;
use iot_protocol::{
    CapabilitySet, ConnectTarget, Connection, Operation, ProtocolAdapter, ProtocolDescriptor,
    ProtocolError, ProtocolRegistry,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 连接行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Instant,
    Delay(Duration),
    Refuse,
    Hang,
}

/// 关闭行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    Clean,
    Fail,
    Hang,
}

/// 回显适配器：send 原样返回首个参数
pub struct EchoAdapter {
    descriptor: ProtocolDescriptor,
    mode: ConnectMode,
    close_mode: CloseMode,
    pub connects: AtomicUsize,
    pub live: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl EchoAdapter {
    pub fn new(id: &str, mode: ConnectMode) -> Self {
        Self::with_capabilities(
            id,
            mode,
            CapabilitySet {
                disconnect: true,
                send: true,
                receive: true,
                ..CapabilitySet::default()
            },
        )
    }

    pub fn with_capabilities(id: &str, mode: ConnectMode, capabilities: CapabilitySet) -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: id.to_string(),
                display_name: "Echo".to_string(),
                description: "echoes sent payloads".to_string(),
                default_port: Some(7),
                secure_port: None,
                capabilities,
            },
            mode,
            close_mode: CloseMode::Clean,
            connects: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_close_mode(mut self, close_mode: CloseMode) -> Self {
        self.close_mode = close_mode;
        self
    }

    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolAdapter for EchoAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, _target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ConnectMode::Instant => {}
            ConnectMode::Delay(delay) => tokio::time::sleep(delay).await,
            ConnectMode::Refuse => {
                return Err(ProtocolError::Connection("connection refused".to_string()));
            }
            ConnectMode::Hang => std::future::pending::<()>().await,
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EchoConnection {
            close_mode: self.close_mode,
            live: self.live.clone(),
            closes: self.closes.clone(),
        }))
    }
}

pub struct EchoConnection {
    close_mode: CloseMode,
    live: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for EchoConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Send => match args.into_iter().next() {
                Some(Value::String(text)) if text == "boom" => {
                    Err(ProtocolError::Connection("peer reset".to_string()))
                }
                Some(Value::String(text)) if text == "sleep" => {
                    std::future::pending::<()>().await;
                    Ok(Value::Null)
                }
                Some(value) => Ok(value),
                None => Err(ProtocolError::InvalidArgs("payload required".to_string())),
            },
            Operation::Receive => match args.first() {
                // 对端一直不发数据
                Some(Value::String(text)) if text == "quiet" => {
                    std::future::pending::<()>().await;
                    Ok(Value::Null)
                }
                _ => Ok(Value::String("tick".to_string())),
            },
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match self.close_mode {
            CloseMode::Clean => Ok(()),
            CloseMode::Fail => Err(ProtocolError::Connection("close rejected".to_string())),
            CloseMode::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

impl Drop for EchoConnection {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn registry_with(adapter: Arc<EchoAdapter>) -> Arc<ProtocolRegistry> {
    let registry = ProtocolRegistry::new();
    registry.register_adapter(adapter);
    Arc::new(registry)
}

/// 本机 Modbus TCP 从站：每个请求都回 IllegalDataAddress (0x02) 异常
pub async fn spawn_modbus_exception_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        loop {
            // MBAP：事务 ID(2) 协议 ID(2) 长度(2) 单元 ID(1)
            let mut header = [0u8; 7];
            if socket.read_exact(&mut header).await.is_err() {
                break;
            }
            let length = u16::from_be_bytes([header[4], header[5]]) as usize;
            let mut pdu = vec![0u8; length.saturating_sub(1)];
            if socket.read_exact(&mut pdu).await.is_err() {
                break;
            }
            let function = pdu.first().copied().unwrap_or(0x03);
            let reply = [
                header[0], header[1], 0, 0, 0, 3, header[6], function | 0x80, 0x02,
            ];
            if socket.write_all(&reply).await.is_err() {
                break;
            }
        }
    });
    port
}
