//! 生命周期事件与事件总线
//!
//! 总线基于 `tokio::sync::broadcast`：发布永不阻塞，
//! 处理过慢的订阅者会收到 `Lagged` 并丢失最旧的事件。
//! 总线随管理器实例释放，所有订阅者随后收到 `Closed`。

use crate::discovery::DiscoveryProgress;
use serde::Serialize;
use tokio::sync::broadcast;

/// 默认事件缓冲容量
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// 设备与发现过程的状态变化事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum IotEvent {
    #[serde(rename_all = "camelCase")]
    DeviceRegistered { device_id: String },
    #[serde(rename_all = "camelCase")]
    DeviceConnected { device_id: String },
    #[serde(rename_all = "camelCase")]
    DeviceDisconnected { device_id: String },
    #[serde(rename_all = "camelCase")]
    DeviceError { device_id: String, error: String },
    #[serde(rename_all = "camelCase")]
    DeviceRemoved { device_id: String },
    DiscoveryProgress(DiscoveryProgress),
}

impl IotEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceRegistered { .. } => "deviceRegistered",
            Self::DeviceConnected { .. } => "deviceConnected",
            Self::DeviceDisconnected { .. } => "deviceDisconnected",
            Self::DeviceError { .. } => "deviceError",
            Self::DeviceRemoved { .. } => "deviceRemoved",
            Self::DiscoveryProgress(_) => "discoveryProgress",
        }
    }

    /// 事件关联的设备 ID（发现进度没有）
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::DeviceRegistered { device_id }
            | Self::DeviceConnected { device_id }
            | Self::DeviceDisconnected { device_id }
            | Self::DeviceError { device_id, .. }
            | Self::DeviceRemoved { device_id } => Some(device_id),
            Self::DiscoveryProgress(_) => None,
        }
    }
}

/// 进程内事件总线
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<IotEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IotEvent> {
        self.sender.subscribe()
    }

    /// 发布事件；没有订阅者时直接丢弃。
    pub fn publish(&self, event: IotEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
