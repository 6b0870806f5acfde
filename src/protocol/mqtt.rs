use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use derive_builder::Builder;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::BridgeError;
use crate::protocol::messages::{DeviceMessage, OutboundMessage};
use crate::protocol::messenger::{DeviceMessenger, DeviceObserverRef};

pub const DEFAULT_TOPIC_PREFIX: &str = "fillerup";
const CLIENT_ID_PREFIX: &str = "FillerUpBridge";
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Builder, Debug, Clone)]
pub struct DeviceLinkOptions {
    pub host: String,
    pub port: u16,
    pub device_id: String,
    pub topic_prefix: String,
    #[builder(default)]
    pub user: Option<String>,
    #[builder(default)]
    pub password: Option<String>,
}

impl DeviceLinkOptions {
    pub fn builder() -> DeviceLinkOptionsBuilder {
        DeviceLinkOptionsBuilder::default()
    }

    /// Topic the watch face publishes on.
    pub fn inbound_topic(&self) -> String {
        format!("{}/{}/tx", self.topic_prefix, self.device_id)
    }

    /// Topic the watch face listens on.
    pub fn outbound_topic(&self) -> String {
        format!("{}/{}/rx", self.topic_prefix, self.device_id)
    }
}

fn generate_client_id() -> String {
    let uuid = Uuid::new_v4();
    format!("{CLIENT_ID_PREFIX}_{}", uuid.to_string().to_uppercase())
}

/// Device channel carried over an MQTT broker, one JSON object per publish.
pub struct MqttMessenger {
    client: AsyncClient,
    outbound_topic: String,
    inbound_topic: String,
    connected: Arc<AtomicBool>,
    event_loop: JoinHandle<()>,
}

impl MqttMessenger {
    pub async fn connect(
        options: DeviceLinkOptions,
        observer: Option<DeviceObserverRef>,
    ) -> Result<Self, BridgeError> {
        let inbound_topic = options.inbound_topic();
        let outbound_topic = options.outbound_topic();

        let mut mqtt_options = MqttOptions::new(generate_client_id(), options.host, options.port);
        mqtt_options.set_keep_alive(Duration::from_secs(5));
        if let (Some(user), Some(password)) = (options.user, options.password) {
            mqtt_options.set_credentials(user, password);
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options.clone(), 10);
        info!(
            "Connecting to MQTT broker at {}:{}",
            mqtt_options.broker_address().0,
            mqtt_options.broker_address().1
        );

        let connected = Arc::new(AtomicBool::new(false));
        let event_loop = tokio::spawn(run_eventloop(
            eventloop,
            client.clone(),
            inbound_topic.clone(),
            connected.clone(),
            observer,
        ));

        Ok(Self {
            client,
            outbound_topic,
            inbound_topic,
            connected,
            event_loop,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.client
            .unsubscribe(&self.inbound_topic)
            .await
            .map_err(|e| BridgeError::Connection(format!("Unsubscribe error: {e}")))?;
        self.client
            .disconnect()
            .await
            .map_err(|e| BridgeError::Connection(format!("Disconnect error: {e}")))?;
        self.event_loop.abort();
        Ok(())
    }
}

async fn run_eventloop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    inbound_topic: String,
    connected: Arc<AtomicBool>,
    observer: Option<DeviceObserverRef>,
) {
    info!("Starting device link event loop");
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Release);
                // the session is not persistent, subscribe again on every connect
                if let Err(e) = client.try_subscribe(inbound_topic.clone(), QoS::AtLeastOnce) {
                    error!("Failed to subscribe to {}: {}", inbound_topic, e);
                    continue;
                }
                info!("Subscribed to topic: {}", inbound_topic);
                if let Some(observer) = &observer {
                    observer.on_ready().await;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == inbound_topic => {
                dispatch_payload(&publish.payload, observer.as_ref()).await;
            }
            Ok(_) => {}
            Err(e) => {
                if connected.swap(false, Ordering::AcqRel) {
                    error!("Device link lost: {:?}", e);
                } else {
                    debug!("Device link still down: {:?}", e);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Parses one inbound publish and hands it to the observer. Returns whether
/// the payload was a device message.
async fn dispatch_payload(payload: &[u8], observer: Option<&DeviceObserverRef>) -> bool {
    debug!("Received device message: {}", String::from_utf8_lossy(payload));
    match serde_json::from_slice::<DeviceMessage>(payload) {
        Ok(message) => {
            if let Some(observer) = observer {
                observer.on_receive(message).await;
            }
            true
        }
        Err(e) => {
            warn!("Failed to parse device message: {}", e);
            false
        }
    }
}

#[async_trait]
impl DeviceMessenger for MqttMessenger {
    async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::Transmission(
                "device link is not connected".to_string(),
            ));
        }
        let payload = message
            .to_bytes()
            .map_err(|e| BridgeError::Transmission(format!("Serialization error: {e}")))?;
        debug!(
            "Sending {} to {}: {}",
            message.kind(),
            self.outbound_topic,
            String::from_utf8_lossy(&payload)
        );
        self.client
            .publish(&self.outbound_topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| BridgeError::Transmission(format!("Failed to publish: {e}")))
    }
}
