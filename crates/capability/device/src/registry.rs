//! 设备注册表
//!
//! 单一拥有者的有序映射：设备 ID → 槽位。每个槽位包含
//! - `record`：对外可见的设备快照（状态、lastSeen 等）
//! - `link`：连接句柄，由每设备互斥锁保护，只有生命周期管理器能访问
//!
//! 不同设备的槽位互不影响；映射本身只在注册与移除时写入。

use crate::error::DeviceError;
use domain::{Device, DeviceConfig, DeviceStatus, DeviceSummary};
use iot_protocol::{Connection, ProtocolRegistry};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// 连接句柄及其移除标记
#[derive(Default)]
pub(crate) struct Link {
    pub(crate) connection: Option<Box<dyn Connection>>,
    /// 槽位已从注册表摘除（或被重新注册替换）
    pub(crate) removed: bool,
}

/// 单个设备的槽位
pub(crate) struct DeviceSlot {
    record: RwLock<Device>,
    pub(crate) link: Mutex<Link>,
}

impl DeviceSlot {
    fn new(device: Device) -> Self {
        Self {
            record: RwLock::new(device),
            link: Mutex::new(Link::default()),
        }
    }

    pub(crate) fn snapshot(&self) -> Option<Device> {
        self.record.read().ok().map(|device| device.clone())
    }

    pub(crate) fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut Device),
    {
        if let Ok(mut device) = self.record.write() {
            apply(&mut device);
        }
    }

    pub(crate) fn set_status(&self, status: DeviceStatus) {
        self.update(|device| device.status = status);
    }
}

/// 设备注册表
pub struct DeviceRegistry {
    protocols: Arc<ProtocolRegistry>,
    slots: RwLock<BTreeMap<String, Arc<DeviceSlot>>>,
}

impl DeviceRegistry {
    pub fn new(protocols: Arc<ProtocolRegistry>) -> Self {
        Self {
            protocols,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    /// 校验协议并写入新槽位，返回新设备与被替换的旧槽位。
    pub(crate) fn insert(
        &self,
        id: &str,
        config: DeviceConfig,
    ) -> Result<(Device, Option<Arc<DeviceSlot>>), DeviceError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DeviceError::InvalidConfig("device id required".to_string()));
        }
        let adapter = self.protocols.get_adapter(&config.protocol_id).ok_or_else(|| {
            DeviceError::UnknownProtocol {
                device_id: id.to_string(),
                protocol_id: config.protocol_id.clone(),
            }
        })?;
        let device = Device::from_config(id, config, adapter.descriptor().default_port);

        let mut slots = self.slots.write().map_err(|_| DeviceError::Lock)?;
        let previous = slots.insert(id.to_string(), Arc::new(DeviceSlot::new(device.clone())));
        Ok((device, previous))
    }

    pub(crate) fn slot(&self, id: &str) -> Option<Arc<DeviceSlot>> {
        self.slots
            .read()
            .ok()
            .and_then(|slots| slots.get(id).cloned())
    }

    pub(crate) fn require_slot(&self, id: &str) -> Result<Arc<DeviceSlot>, DeviceError> {
        self.slot(id)
            .ok_or_else(|| DeviceError::DeviceNotFound(id.to_string()))
    }

    /// 仅当映射中仍是同一个槽位时才摘除（避免误删并发重新注册的设备）
    pub(crate) fn remove_if_same(&self, id: &str, slot: &Arc<DeviceSlot>) -> bool {
        let Ok(mut slots) = self.slots.write() else {
            return false;
        };
        match slots.get(id) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                slots.remove(id);
                true
            }
            _ => false,
        }
    }

    /// 设备完整快照（含凭据，仅供内部与调试使用）
    pub fn get_device(&self, id: &str) -> Result<Device, DeviceError> {
        self.require_slot(id)?
            .snapshot()
            .ok_or(DeviceError::Lock)
    }

    /// 对外列表投影（不含凭据与元数据），按设备 ID 排序
    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        let slots: Vec<Arc<DeviceSlot>> = self
            .slots
            .read()
            .map(|slots| slots.values().cloned().collect())
            .unwrap_or_default();
        slots
            .iter()
            .filter_map(|slot| slot.snapshot())
            .map(|device| device.summary())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slot(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(Arc::new(ProtocolRegistry::with_builtin_adapters()))
    }

    #[test]
    fn test_insert_resolves_default_port() {
        let registry = registry();
        let (device, previous) = registry
            .insert("plc-1", DeviceConfig::new("modbus", "10.0.0.5", None))
            .unwrap();
        assert!(previous.is_none());
        assert_eq!(device.port, Some(502));
        assert_eq!(device.status, DeviceStatus::Disconnected);
        assert_eq!(device.last_seen_ms, None);
    }

    #[test]
    fn test_unknown_protocol_creates_no_entry() {
        let registry = registry();
        let result = registry.insert("x", DeviceConfig::new("zigbee", "10.0.0.5", None));
        assert!(matches!(result, Err(DeviceError::UnknownProtocol { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reinsert_returns_previous_slot() {
        let registry = registry();
        registry
            .insert("d1", DeviceConfig::new("tcp", "10.0.0.5", Some(9000)))
            .unwrap();
        let (_, previous) = registry
            .insert("d1", DeviceConfig::new("tcp", "10.0.0.6", Some(9000)))
            .unwrap();
        let previous = previous.expect("previous slot");
        assert!(!registry.remove_if_same("d1", &previous));
        assert_eq!(registry.get_device("d1").unwrap().host, "10.0.0.6");
    }

    #[test]
    fn test_list_sorted_and_projected() {
        let registry = registry();
        let mut config = DeviceConfig::new("tcp", "10.0.0.5", Some(9000));
        config
            .credentials
            .insert("password".to_string(), serde_json::json!("secret"));
        registry.insert("b", config).unwrap();
        registry
            .insert("a", DeviceConfig::new("udp", "10.0.0.6", Some(9001)))
            .unwrap();
        let listed = registry.list_devices();
        let ids: Vec<&str> = listed.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_blank_id_rejected() {
        let registry = registry();
        assert!(matches!(
            registry.insert("  ", DeviceConfig::new("tcp", "h", Some(1))),
            Err(DeviceError::InvalidConfig(_))
        ));
    }
}
