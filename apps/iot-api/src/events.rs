//! 事件日志订阅者：把总线上的生命周期事件写入结构化日志

use domain::IotEvent;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 启动订阅任务；总线关闭后任务自行结束
pub fn spawn_event_logger(mut rx: Receiver<IotEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "iot.events", skipped, "event_subscriber_lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &IotEvent) {
    match event {
        IotEvent::DeviceError { device_id, error } => {
            warn!(target: "iot.events", event = event.name(), device_id = %device_id, error = %error, "iot_event");
        }
        IotEvent::DiscoveryProgress(progress) => {
            info!(
                target: "iot.events",
                event = event.name(),
                scanned = progress.scanned,
                total = progress.total,
                found = progress.found,
                "iot_event"
            );
        }
        other => {
            info!(target: "iot.events", event = other.name(), device_id = other.device_id().unwrap_or_default(), "iot_event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::EventBus;
    use std::time::Duration;

    #[tokio::test]
    async fn logger_stops_when_bus_dropped() {
        let bus = EventBus::new(4);
        let handle = spawn_event_logger(bus.subscribe());
        bus.publish(IotEvent::DeviceRegistered {
            device_id: "d1".to_string(),
        });
        drop(bus);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("logger should exit")
            .expect("logger task");
    }
}
