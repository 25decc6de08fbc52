//! 分批扫描
//!
//! 主机按 `batchSize` 分批顺序处理；批内 主机 × 端口 全部并发探测，
//! 同时在途的连接数不超过 `batchSize × 端口数`。每批结束发布一次进度事件。

use crate::error::{DiscoveryError, ProbeError};
use crate::ports::{DiscoveryOptions, PortProfile, default_port_table};
use crate::prober::PortProber;
use domain::{DiscoveryProgress, DiscoveryResult, EventBus, IotEvent, now_epoch_ms};
use iot_telemetry::{record_discovery_run, record_endpoints_found, record_probes};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// 网络发现扫描器
pub struct Discoverer {
    prober: Arc<dyn PortProber>,
    events: EventBus,
    ports: Vec<PortProfile>,
}

impl Discoverer {
    pub fn new(prober: Arc<dyn PortProber>, events: EventBus) -> Self {
        Self {
            prober,
            events,
            ports: default_port_table(),
        }
    }

    /// 替换默认端口表
    pub fn with_ports(mut self, ports: Vec<PortProfile>) -> Self {
        self.ports = ports;
        self
    }

    pub fn port_table(&self) -> &[PortProfile] {
        &self.ports
    }

    /// 执行一次扫描，结果按主机、端口表顺序排列
    pub async fn discover(
        &self,
        options: DiscoveryOptions,
    ) -> Result<Vec<DiscoveryResult>, DiscoveryError> {
        let ports = Arc::new(options.ports.clone().unwrap_or_else(|| self.ports.clone()));
        options.validate(&ports)?;

        let subnet = options.subnet.trim().to_string();
        let total = options.host_count();
        let timeout = Duration::from_millis(options.timeout_ms);
        let hosts: Vec<u16> = (options.start_host..=options.end_host).collect();
        record_discovery_run();
        info!(
            target: "iot.discovery",
            subnet = %subnet,
            start_host = options.start_host,
            end_host = options.end_host,
            batch_size = options.batch_size,
            ports = ports.len(),
            "discovery_started"
        );

        let mut found: Vec<DiscoveryResult> = Vec::new();
        let mut scanned: u32 = 0;
        for batch in hosts.chunks(options.batch_size) {
            let mut probes = JoinSet::new();
            for &octet in batch {
                let host = format!("{}.{}", subnet, octet);
                for (index, profile) in ports.iter().enumerate() {
                    let prober = self.prober.clone();
                    let host = host.clone();
                    let port = profile.port;
                    probes.spawn(async move {
                        let outcome = prober.probe(&host, port, timeout).await;
                        (octet, index, host, outcome)
                    });
                }
            }
            record_probes((batch.len() * ports.len()) as u64);

            let mut open = Vec::new();
            let mut fatal = None;
            while let Some(joined) = probes.join_next().await {
                match joined {
                    Ok((octet, index, host, Ok(true))) => open.push((octet, index, host)),
                    Ok((_, _, _, Ok(false))) => {}
                    Ok((_, _, _, Err(ProbeError::Fatal(message)))) => {
                        fatal = Some(message);
                        break;
                    }
                    Err(err) => {
                        warn!(target: "iot.discovery", error = %err, "probe_task_failed");
                    }
                }
            }
            if let Some(message) = fatal {
                probes.shutdown().await;
                warn!(
                    target: "iot.discovery",
                    subnet = %subnet,
                    scanned,
                    found = found.len(),
                    error = %message,
                    "discovery_aborted"
                );
                record_endpoints_found(found.len() as u64);
                return Err(DiscoveryError::Fatal {
                    message,
                    partial: found,
                });
            }

            open.sort_by_key(|(octet, index, _)| (*octet, *index));
            let discovered_at_ms = now_epoch_ms();
            found.extend(open.into_iter().map(|(_, index, host)| {
                let profile = &ports[index];
                DiscoveryResult {
                    host,
                    port: profile.port,
                    protocol_id: profile.protocol_id.clone(),
                    display_name: profile.display_name.clone(),
                    discovered_at_ms,
                }
            }));

            scanned = (scanned + batch.len() as u32).min(total);
            self.events.publish(IotEvent::DiscoveryProgress(DiscoveryProgress {
                scanned,
                total,
                found: found.len(),
            }));
        }

        record_endpoints_found(found.len() as u64);
        info!(
            target: "iot.discovery",
            subnet = %subnet,
            scanned,
            found = found.len(),
            "discovery_completed"
        );
        Ok(found)
    }
}
