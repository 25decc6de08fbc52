//! 协议注册表
//!
//! 启动时注册适配器，之后以读为主。按 ID upsert，保持首次注册顺序。

use crate::adapter::ProtocolAdapter;
use crate::http::HttpAdapter;
use crate::modbus_tcp::ModbusTcpAdapter;
use crate::mqtt::MqttAdapter;
use crate::tcp_client::TcpAdapter;
use crate::types::ProtocolDescriptor;
use crate::udp::UdpAdapter;
use std::sync::{Arc, RwLock};
use tracing::info;

/// 协议注册表
#[derive(Default)]
pub struct ProtocolRegistry {
    adapters: RwLock<Vec<Arc<dyn ProtocolAdapter>>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册内置适配器：tcp、udp、modbus、mqtt、http
    pub fn with_builtin_adapters() -> Self {
        let registry = Self::new();
        registry.register_adapter(Arc::new(TcpAdapter::new()));
        registry.register_adapter(Arc::new(UdpAdapter::new()));
        registry.register_adapter(Arc::new(ModbusTcpAdapter::new()));
        registry.register_adapter(Arc::new(MqttAdapter::new()));
        registry.register_adapter(Arc::new(HttpAdapter::new()));
        registry
    }

    /// 注册适配器；同 ID 后注册者覆盖
    pub fn register_adapter(&self, adapter: Arc<dyn ProtocolAdapter>) {
        let id = adapter.descriptor().id.clone();
        let Ok(mut adapters) = self.adapters.write() else {
            return;
        };
        match adapters
            .iter_mut()
            .find(|existing| existing.descriptor().id == id)
        {
            Some(existing) => *existing = adapter,
            None => adapters.push(adapter),
        }
        info!(target: "iot.protocol", protocol_id = %id, "protocol_registered");
    }

    /// 协议描述快照
    pub fn list_adapters(&self) -> Vec<ProtocolDescriptor> {
        self.adapters
            .read()
            .map(|adapters| {
                adapters
                    .iter()
                    .map(|adapter| adapter.descriptor().clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 查找适配器
    pub fn get_adapter(&self, id: &str) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.read().ok().and_then(|adapters| {
            adapters
                .iter()
                .find(|adapter| adapter.descriptor().id == id)
                .cloned()
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get_adapter(id).is_some()
    }
}
