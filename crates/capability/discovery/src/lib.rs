//! # 网络发现能力模块
//!
//! 在 `subnet.startHost..=subnet.endHost` × 端口表 上做有界并发的 TCP 探测，
//! 只提出候选端点，不会自动注册设备。
//!
//! ```text
//! hosts ──chunks(batchSize)──▶ JoinSet(主机 × 端口) ──▶ DiscoveryResult
//!                                   │
//!                                   └── 每批一次 discoveryProgress
//! ```

mod error;
mod ports;
mod prober;
mod sweeper;

pub use error::{DiscoveryError, ProbeError};
pub use ports::{DiscoveryOptions, PortProfile, default_port_table, parse_port_table};
pub use prober::{PortProber, TcpProber, is_resource_exhaustion};
pub use sweeper::Discoverer;
