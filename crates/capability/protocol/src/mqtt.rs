//! MQTT 适配器
//!
//! 连接在收到 CONNACK 后完成；之后由后台任务驱动事件循环，
//! 将收到的 Publish 转入有界队列，供 receive 调用取出。
//!
//! ## 调用示例
//!
//! ```json
//! // publish：[topic, payload, qos?]
//! ["sensors/t1/cmd", "{\"on\":true}", 1]
//! // subscribe：[topic, qos?]
//! ["sensors/#"]
//! // receive：无参数，返回 {"topic": ..., "payload": ...}
//! []
//! ```

use crate::adapter::{Connection, ProtocolAdapter};
use crate::args::{bytes_to_value, optional_u64, payload_bytes, required_str};
use crate::error::ProtocolError;
use crate::types::{CapabilitySet, ConnectTarget, Operation, ProtocolDescriptor};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// MQTT 默认端口
pub const MQTT_DEFAULT_PORT: u16 = 1883;
/// MQTT over TLS 端口
pub const MQTT_SECURE_PORT: u16 = 8883;

/// 收件队列容量
const INBOX_CAPACITY: usize = 256;

/// MQTT 适配器
pub struct MqttAdapter {
    descriptor: ProtocolDescriptor,
}

impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            descriptor: ProtocolDescriptor {
                id: "mqtt".to_string(),
                display_name: "MQTT".to_string(),
                description: "Message Queuing Telemetry Transport".to_string(),
                default_port: Some(MQTT_DEFAULT_PORT),
                secure_port: Some(MQTT_SECURE_PORT),
                capabilities: CapabilitySet {
                    disconnect: true,
                    receive: true,
                    subscribe: true,
                    publish: true,
                    ..CapabilitySet::default()
                },
            },
        }
    }

    fn options(target: &ConnectTarget) -> MqttOptions {
        let client_id = target
            .credential_str("clientId")
            .map(str::to_string)
            .unwrap_or_else(|| format!("iot-hub-{}", uuid::Uuid::new_v4()));
        let port = target.port.unwrap_or(MQTT_DEFAULT_PORT);
        let mut options = MqttOptions::new(client_id, target.host.clone(), port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (
            target.credential_str("username"),
            target.credential_str("password"),
        ) {
            options.set_credentials(username, password);
        }
        options
    }
}

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolAdapter for MqttAdapter {
    fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    async fn connect(&self, target: &ConnectTarget) -> Result<Box<dyn Connection>, ProtocolError> {
        let (client, mut eventloop) = AsyncClient::new(Self::options(target), 10);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(ProtocolError::Connection(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    break;
                }
                Ok(_) => {}
                Err(err) => return Err(ProtocolError::Connection(err.to_string())),
            }
        }
        debug!(host = %target.host, "mqtt connected");

        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let pump = tokio::spawn(pump_events(eventloop, tx));
        Ok(Box::new(MqttConnection {
            client,
            inbox,
            pump,
        }))
    }
}

/// 驱动事件循环并投递收到的消息，直到断开或句柄释放
async fn pump_events(mut eventloop: EventLoop, tx: mpsc::Sender<(String, Vec<u8>)>) {
    loop {
        if tx.is_closed() {
            break;
        }
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(mpsc::error::TrySendError::Full(_)) =
                    tx.try_send((publish.topic.clone(), publish.payload.to_vec()))
                {
                    warn!(target: "iot.protocol", topic = %publish.topic, "mqtt inbox full, message dropped");
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(target: "iot.protocol", "mqtt eventloop error: {}", err);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// MQTT 连接句柄
pub struct MqttConnection {
    client: AsyncClient,
    inbox: mpsc::Receiver<(String, Vec<u8>)>,
    pump: JoinHandle<()>,
}

#[async_trait]
impl Connection for MqttConnection {
    async fn invoke(&mut self, operation: Operation, args: Vec<Value>) -> Result<Value, ProtocolError> {
        match operation {
            Operation::Publish => {
                let topic = required_str(&args, 0, "topic")?;
                let payload = payload_bytes(args.get(1).unwrap_or(&Value::Null))?;
                let qos = qos_arg(&args, 2)?;
                self.client.publish(topic, qos, false, payload).await?;
                Ok(Value::Null)
            }
            Operation::Subscribe => {
                let topic = required_str(&args, 0, "topic")?;
                let qos = qos_arg(&args, 1)?;
                self.client.subscribe(topic, qos).await?;
                Ok(Value::Null)
            }
            Operation::Receive => {
                let (topic, payload) = self.inbox.recv().await.ok_or(ProtocolError::ChannelClosed)?;
                Ok(json!({ "topic": topic, "payload": bytes_to_value(&payload) }))
            }
            other => Err(ProtocolError::Unsupported(other.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        let result = self.client.disconnect().await;
        if tokio::time::timeout(Duration::from_secs(1), &mut self.pump)
            .await
            .is_err()
        {
            self.pump.abort();
        }
        result.map_err(ProtocolError::from)
    }
}

impl Drop for MqttConnection {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// QoS 参数：缺省为 0，只接受 0..=2
fn qos_arg(args: &[Value], index: usize) -> Result<QoS, ProtocolError> {
    match optional_u64(args, index).unwrap_or(0) {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ProtocolError::InvalidArgs(format!("invalid qos: {}", other))),
    }
}
