//! IoT 设备管理的共享领域模型。
//!
//! - `device`：设备配置、运行状态与对外投影
//! - `discovery`：网络发现结果与进度
//! - `event`：生命周期事件与进程内事件总线

pub mod device;
pub mod discovery;
pub mod event;

pub use device::{Credentials, Device, DeviceConfig, DeviceStatus, DeviceSummary, Metadata};
pub use discovery::{DiscoveryProgress, DiscoveryResult};
pub use event::{EventBus, IotEvent};

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
