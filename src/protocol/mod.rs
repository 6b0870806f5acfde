mod configuration;
mod messages;
mod messenger;
mod mqtt;
mod variant;

pub use configuration::{CANCELLED, ConfigurationResult, PAGE_FIELDS};
pub use messages::{
    DeviceMessage, OutboundMessage, SettingsMessage, SetupInfoRequest, make_settings_message,
    make_setup_info_request,
};
pub use messenger::{DeviceMessenger, DeviceObserver, DeviceObserverRef};
pub use mqtt::{DEFAULT_TOPIC_PREFIX, DeviceLinkOptions, DeviceLinkOptionsBuilder, MqttMessenger};
pub use variant::ProtocolVariant;
