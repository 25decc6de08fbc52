//! 发现错误类型定义

use domain::DiscoveryResult;

/// 扫描错误
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// 参数非法，未发出任何探测
    #[error("invalid discovery options: {0}")]
    InvalidOptions(String),

    /// 系统资源耗尽，剩余扫描被放弃；`partial` 为已完成批次的结果
    #[error("discovery aborted: {message}")]
    Fatal {
        message: String,
        partial: Vec<DiscoveryResult>,
    },
}

/// 单次探测错误
///
/// 端口关闭、被过滤或超时都不算错误，只有资源耗尽会中止扫描。
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("resource exhausted: {0}")]
    Fatal(String),
}
