use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::protocol::messages::{DeviceMessage, OutboundMessage};

/// Outbound half of the device channel. `Ok` means the device accepted the
/// message, `Err(BridgeError::Transmission)` that it could not be delivered.
/// Implementations never retry.
#[async_trait]
pub trait DeviceMessenger: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError>;
}

/// Inbound half of the device channel, invoked for every message the device
/// pushes.
#[async_trait]
pub trait DeviceObserver: Send + Sync {
    async fn on_receive(&self, message: DeviceMessage);

    /// Called when the link to the device is (re)established.
    async fn on_ready(&self) {}
}

pub type DeviceObserverRef = Arc<dyn DeviceObserver>;

#[async_trait]
impl<M: DeviceMessenger + ?Sized> DeviceMessenger for Arc<M> {
    async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        (**self).send(message).await
    }
}
