//! # 协议适配能力模块
//!
//! 以统一的协议 ID 将传输细节隔离在适配器之后：
//! - **ProtocolRegistry**：协议 ID → 适配器，启动时注册，之后只读
//! - **ProtocolAdapter**：建立连接，声明能力集
//! - **Connection**：连接句柄，按操作分派调用
//!
//! ## 架构设计
//!
//! ```text
//! ProtocolRegistry
//!       │
//!       ├── TcpAdapter      (send / receive / disconnect)
//!       ├── UdpAdapter      (send / receive / disconnect)
//!       ├── ModbusTcpAdapter(request / disconnect)
//!       ├── MqttAdapter     (publish / subscribe / receive / disconnect)
//!       └── HttpAdapter     (request)
//!       │
//!       ▼
//! Box<dyn Connection>（由设备生命周期管理器独占持有）
//! ```
//!
//! 新协议通过注册新的适配器接入，无需修改管理器。

mod adapter;
pub mod args;
mod error;
mod http;
mod modbus_tcp;
mod mqtt;
mod registry;
mod tcp_client;
mod types;
mod udp;

pub use adapter::{Connection, ProtocolAdapter};
pub use error::ProtocolError;
pub use http::{HttpAdapter, HttpRequest, parse_base_url};
pub use modbus_tcp::{ModbusRequest, ModbusTcpAdapter, decode_registers};
pub use mqtt::MqttAdapter;
pub use registry::ProtocolRegistry;
pub use tcp_client::TcpAdapter;
pub use types::*;
pub use udp::UdpAdapter;
