//! 连接生命周期管理器
//!
//! 状态机（每设备）：
//!
//! ```text
//! disconnected ──connect──▶ connected ──disconnect──▶ disconnected
//!                              │
//!                        (传输错误)
//!                              ▼
//! error ──────────connect──▶ connected
//! ```
//!
//! 同一设备的 connect / disconnect / invoke / remove 经槽位互斥锁串行化，
//! 不同设备完全独立。每次传输调用都有硬超时，锁不会被永久占用。
//! 所有状态变化先发布事件，再把结果返回给调用方。

use crate::error::DeviceError;
use crate::registry::{DeviceRegistry, DeviceSlot};
use domain::{Device, DeviceConfig, DeviceStatus, DeviceSummary, EventBus, IotEvent, now_epoch_ms};
use domain::event::DEFAULT_EVENT_CAPACITY;
use iot_protocol::{ConnectTarget, Connection, Operation, ProtocolDescriptor, ProtocolError, ProtocolRegistry};
use iot_telemetry::{
    record_connect_failure, record_connect_success, record_device_registered, record_device_removed,
    record_disconnect, record_invocation_failure, record_invocation_latency_ms,
    record_invocation_success,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// 管理器配置
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub connect_timeout: Duration,
    pub invoke_timeout: Duration,
    /// 关闭连接的上限；超时后直接丢弃句柄
    pub disconnect_timeout: Duration,
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            invoke_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(5),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// 设备管理器（注册表 + 生命周期 + 事件）
pub struct DeviceManager {
    protocols: Arc<ProtocolRegistry>,
    devices: DeviceRegistry,
    events: EventBus,
    config: ManagerConfig,
}

impl DeviceManager {
    pub fn new(protocols: Arc<ProtocolRegistry>) -> Self {
        Self::new_with_config(protocols, ManagerConfig::default())
    }

    pub fn new_with_config(protocols: Arc<ProtocolRegistry>, config: ManagerConfig) -> Self {
        Self {
            devices: DeviceRegistry::new(protocols.clone()),
            events: EventBus::new(config.event_capacity),
            protocols,
            config,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IotEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn list_protocols(&self) -> Vec<ProtocolDescriptor> {
        self.protocols.list_adapters()
    }

    /// 注册设备。同 ID 重新注册会先强制断开旧连接，新设备从 disconnected 开始。
    pub async fn register_device(
        &self,
        id: &str,
        config: DeviceConfig,
    ) -> Result<Device, DeviceError> {
        let (device, previous) = self.devices.insert(id, config)?;
        if let Some(previous) = previous {
            self.retire(&device.id, &previous).await;
        }
        record_device_registered();
        info!(
            target: "iot.device",
            device_id = %device.id,
            protocol_id = %device.protocol_id,
            host = %device.host,
            port = ?device.port,
            "device_registered"
        );
        self.events.publish(IotEvent::DeviceRegistered {
            device_id: device.id.clone(),
        });
        Ok(device)
    }

    pub fn get_device(&self, id: &str) -> Result<Device, DeviceError> {
        self.devices.get_device(id)
    }

    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.devices.list_devices()
    }

    /// 当前是否持有连接句柄
    pub async fn has_connection(&self, id: &str) -> Result<bool, DeviceError> {
        let slot = self.devices.require_slot(id)?;
        let link = slot.link.lock().await;
        if link.removed {
            return Err(DeviceError::DeviceNotFound(id.to_string()));
        }
        Ok(link.connection.is_some())
    }

    /// 建立连接。已连接时直接返回，不会重复调用适配器。
    pub async fn connect_device(&self, id: &str) -> Result<Device, DeviceError> {
        let slot = self.devices.require_slot(id)?;
        let mut link = slot.link.lock().await;
        if link.removed {
            return Err(DeviceError::DeviceNotFound(id.to_string()));
        }
        let device = slot.snapshot().ok_or(DeviceError::Lock)?;
        if link.connection.is_some() {
            return Ok(device);
        }
        let adapter = self.protocols.get_adapter(&device.protocol_id).ok_or_else(|| {
            DeviceError::ProtocolNotSupported {
                device_id: device.id.clone(),
                protocol_id: device.protocol_id.clone(),
            }
        })?;

        let target = ConnectTarget {
            host: device.host.clone(),
            port: device.port,
            credentials: device.credentials.clone(),
        };
        let outcome = match timeout(self.config.connect_timeout, adapter.connect(&target)).await {
            Ok(result) => result.map_err(|err| err.to_string()),
            Err(_) => Err(format!(
                "connect timed out after {} ms",
                self.config.connect_timeout.as_millis()
            )),
        };

        match outcome {
            Ok(connection) => {
                link.connection = Some(connection);
                let now_ms = now_epoch_ms();
                slot.update(|device| {
                    device.status = DeviceStatus::Connected;
                    device.touch(now_ms);
                });
                record_connect_success();
                info!(
                    target: "iot.device",
                    device_id = %device.id,
                    protocol_id = %device.protocol_id,
                    host = %device.host,
                    port = ?device.port,
                    "device_connected"
                );
                self.events.publish(IotEvent::DeviceConnected {
                    device_id: device.id.clone(),
                });
                slot.snapshot().ok_or(DeviceError::Lock)
            }
            Err(message) => {
                slot.set_status(DeviceStatus::Error);
                record_connect_failure();
                warn!(
                    target: "iot.device",
                    device_id = %device.id,
                    protocol_id = %device.protocol_id,
                    error = %message,
                    "device_connect_failed"
                );
                self.events.publish(IotEvent::DeviceError {
                    device_id: device.id.clone(),
                    error: message.clone(),
                });
                Err(DeviceError::ConnectionFailure {
                    device_id: device.id,
                    protocol_id: device.protocol_id,
                    message,
                })
            }
        }
    }

    /// 断开连接。只对存在的设备失败；关闭错误只记录日志。
    pub async fn disconnect_device(&self, id: &str) -> Result<Device, DeviceError> {
        let slot = self.devices.require_slot(id)?;
        let mut link = slot.link.lock().await;
        if link.removed {
            return Err(DeviceError::DeviceNotFound(id.to_string()));
        }
        let device = slot.snapshot().ok_or(DeviceError::Lock)?;
        if let Some(connection) = link.connection.take() {
            self.release(&device, connection).await;
        }
        slot.set_status(DeviceStatus::Disconnected);
        record_disconnect();
        info!(
            target: "iot.device",
            device_id = %device.id,
            protocol_id = %device.protocol_id,
            "device_disconnected"
        );
        self.events.publish(IotEvent::DeviceDisconnected {
            device_id: device.id.clone(),
        });
        slot.snapshot().ok_or(DeviceError::Lock)
    }

    /// 通过已建立的连接执行一次操作，适配器结果原样返回。
    pub async fn invoke(
        &self,
        id: &str,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<Value, DeviceError> {
        let slot = self.devices.require_slot(id)?;
        let mut link = slot.link.lock().await;
        if link.removed {
            return Err(DeviceError::DeviceNotFound(id.to_string()));
        }
        let device = slot.snapshot().ok_or(DeviceError::Lock)?;
        let Some(connection) = link.connection.as_mut() else {
            return Err(DeviceError::DeviceNotConnected(device.id));
        };
        let adapter = self.protocols.get_adapter(&device.protocol_id).ok_or_else(|| {
            DeviceError::ProtocolNotSupported {
                device_id: device.id.clone(),
                protocol_id: device.protocol_id.clone(),
            }
        })?;
        let not_supported = || DeviceError::OperationNotSupported {
            device_id: device.id.clone(),
            protocol_id: device.protocol_id.clone(),
            operation: operation.to_string(),
        };
        let operation: Operation = operation.parse().map_err(|_| not_supported())?;
        if !adapter.descriptor().capabilities.supports(operation) {
            return Err(not_supported());
        }

        let started_at = Instant::now();
        let outcome = match timeout(self.config.invoke_timeout, connection.invoke(operation, args)).await {
            Ok(result) => result,
            // 空闲的 receive 只是没有数据，不影响连接
            Err(_) if operation == Operation::Receive => Err(ProtocolError::NoData(format!(
                "nothing received within {} ms",
                self.config.invoke_timeout.as_millis()
            ))),
            Err(_) => Err(ProtocolError::Timeout(format!(
                "{} timed out after {} ms",
                operation,
                self.config.invoke_timeout.as_millis()
            ))),
        };
        record_invocation_latency_ms(started_at.elapsed().as_millis() as u64);

        match outcome {
            Ok(value) => {
                let now_ms = now_epoch_ms();
                slot.update(|device| device.touch(now_ms));
                record_invocation_success();
                debug!(
                    target: "iot.device",
                    device_id = %device.id,
                    operation = %operation,
                    "device_invoked"
                );
                Ok(value)
            }
            Err(err) => {
                record_invocation_failure();
                let message = err.to_string();
                if err.is_transport() {
                    link.connection = None;
                    slot.set_status(DeviceStatus::Error);
                    warn!(
                        target: "iot.device",
                        device_id = %device.id,
                        protocol_id = %device.protocol_id,
                        operation = %operation,
                        error = %message,
                        "device_transport_error"
                    );
                    self.events.publish(IotEvent::DeviceError {
                        device_id: device.id.clone(),
                        error: message.clone(),
                    });
                }
                Err(DeviceError::InvocationFailure {
                    device_id: device.id,
                    protocol_id: device.protocol_id,
                    operation: operation.to_string(),
                    message,
                })
            }
        }
    }

    /// 移除设备。已连接时先尽力断开，断开失败或超时都不会阻止移除。
    pub async fn remove_device(&self, id: &str) -> Result<(), DeviceError> {
        let slot = self.devices.require_slot(id)?;
        let mut link = slot.link.lock().await;
        if link.removed {
            return Err(DeviceError::DeviceNotFound(id.to_string()));
        }
        let device = slot.snapshot().ok_or(DeviceError::Lock)?;
        if let Some(connection) = link.connection.take() {
            self.release(&device, connection).await;
            slot.set_status(DeviceStatus::Disconnected);
            record_disconnect();
            self.events.publish(IotEvent::DeviceDisconnected {
                device_id: device.id.clone(),
            });
        }
        link.removed = true;
        self.devices.remove_if_same(&device.id, &slot);
        drop(link);

        record_device_removed();
        info!(
            target: "iot.device",
            device_id = %device.id,
            protocol_id = %device.protocol_id,
            "device_removed"
        );
        self.events.publish(IotEvent::DeviceRemoved {
            device_id: device.id,
        });
        Ok(())
    }

    /// 摘除被重新注册替换的旧槽位，并释放其连接
    async fn retire(&self, id: &str, slot: &Arc<DeviceSlot>) {
        let mut link = slot.link.lock().await;
        link.removed = true;
        let Some(connection) = link.connection.take() else {
            return;
        };
        if let Some(device) = slot.snapshot() {
            self.release(&device, connection).await;
        }
        slot.set_status(DeviceStatus::Disconnected);
        record_disconnect();
        info!(target: "iot.device", device_id = %id, "device_replaced_connection_released");
        self.events.publish(IotEvent::DeviceDisconnected {
            device_id: id.to_string(),
        });
    }

    /// 关闭连接句柄；适配器未声明 disconnect 能力时直接丢弃
    async fn release(&self, device: &Device, mut connection: Box<dyn Connection>) {
        let supports_disconnect = self
            .protocols
            .get_adapter(&device.protocol_id)
            .map(|adapter| adapter.descriptor().capabilities.disconnect)
            .unwrap_or(false);
        if !supports_disconnect {
            return;
        }
        match timeout(self.config.disconnect_timeout, connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    target: "iot.device",
                    device_id = %device.id,
                    protocol_id = %device.protocol_id,
                    error = %err,
                    "device_close_failed"
                );
            }
            Err(_) => {
                warn!(
                    target: "iot.device",
                    device_id = %device.id,
                    protocol_id = %device.protocol_id,
                    timeout_ms = self.config.disconnect_timeout.as_millis() as u64,
                    "device_close_timed_out"
                );
            }
        }
    }
}
