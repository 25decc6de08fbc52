//! # 设备能力模块
//!
//! - **DeviceRegistry**：设备 ID → 配置与状态，注册时校验协议
//! - **DeviceManager**：connect / disconnect / invoke / remove 生命周期，
//!   独占持有连接句柄并通过事件总线发布状态变化
//! - **API 设备**：基于 http 适配器的 REST 端点封装

mod api;
mod error;
mod manager;
mod registry;

pub use api::{API_DEVICE_TYPE, API_PROTOCOL_ID, ApiConfig};
pub use error::DeviceError;
pub use manager::{DeviceManager, ManagerConfig};
pub use registry::DeviceRegistry;
