//! 端口探测

use crate::error::ProbeError;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

/// 端口探测器
///
/// 返回 `Ok(true)` 表示端口可建立连接；关闭、过滤与超时一律为 `Ok(false)`。
#[async_trait]
pub trait PortProber: Send + Sync {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<bool, ProbeError>;
}

/// 基于 TCP connect 的探测器
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProber;

#[async_trait]
impl PortProber for TcpProber {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<bool, ProbeError> {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(true),
            Ok(Err(err)) if is_resource_exhaustion(&err) => Err(ProbeError::Fatal(format!(
                "{}:{}: {}",
                host, port, err
            ))),
            Ok(Err(_)) | Err(_) => Ok(false),
        }
    }
}

#[cfg(unix)]
const EXHAUSTION_CODES: &[i32] = &[23, 24]; // ENFILE, EMFILE

#[cfg(windows)]
const EXHAUSTION_CODES: &[i32] = &[10024, 10055]; // WSAEMFILE, WSAENOBUFS

#[cfg(not(any(unix, windows)))]
const EXHAUSTION_CODES: &[i32] = &[];

/// 无法分配套接字（文件描述符或内存耗尽）
pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
        || err
            .raw_os_error()
            .is_some_and(|code| EXHAUSTION_CODES.contains(&code))
}
