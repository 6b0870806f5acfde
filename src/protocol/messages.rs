use serde::{Deserialize, Serialize};

use crate::coerce::lenient_int;
use crate::protocol::variant::ProtocolVariant;
use crate::store::{KeyValueStorage, Preference, SettingsStore};

/// Sparse message pushed by the watch face. Only fields the device had to
/// report are present.
#[derive(Default, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceMessage {
    #[serde(
        rename = "KEY_INSTALLED_VERSION",
        default,
        deserialize_with = "lenient_int"
    )]
    pub installed_version: Option<i32>,
    #[serde(rename = "KEY_CLOCK_24_HOUR", default, deserialize_with = "lenient_int")]
    pub clock_24_hour: Option<i32>,
}

impl DeviceMessage {
    pub fn is_empty(&self) -> bool {
        self.installed_version.is_none() && self.clock_24_hour.is_none()
    }

    /// Present fields paired with the preference they update.
    pub fn fields(&self) -> Vec<(Preference, i32)> {
        [
            (Preference::InstalledVersion, self.installed_version),
            (Preference::Clock24Hour, self.clock_24_hour),
        ]
        .into_iter()
        .filter_map(|(p, v)| v.map(|v| (p, v)))
        .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SetupInfoRequest {
    #[serde(rename = "KEY_REQUEST_SETUP_INFO")]
    pub request_setup_info: i32,
}

/// Settings pushed to the watch face after the user confirms the page.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettingsMessage {
    #[serde(rename = "KEY_CURRENT_VERSION")]
    pub current_version: i32,
    #[serde(
        rename = "KEY_INSTALLED_VERSION",
        skip_serializing_if = "Option::is_none"
    )]
    pub installed_version: Option<i32>,
    #[serde(rename = "KEY_HOUR_VIBRATE")]
    pub hour_vibrate: i32,
    #[serde(
        rename = "KEY_HOUR_VIBRATE_START",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour_vibrate_start: Option<i32>,
    #[serde(
        rename = "KEY_HOUR_VIBRATE_END",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour_vibrate_end: Option<i32>,
    #[serde(rename = "KEY_BLUETOOTH_VIBRATE")]
    pub bluetooth_vibrate: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    SetupInfoRequest(SetupInfoRequest),
    Settings(SettingsMessage),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::SetupInfoRequest(_) => "setup info request",
            OutboundMessage::Settings(_) => "settings",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

pub fn make_setup_info_request() -> OutboundMessage {
    OutboundMessage::SetupInfoRequest(SetupInfoRequest {
        request_setup_info: 0,
    })
}

/// Builds the settings message for `variant` from what is currently stored.
pub fn make_settings_message<S: KeyValueStorage>(
    store: &SettingsStore<S>,
    variant: ProtocolVariant,
) -> SettingsMessage {
    let current_version = store.get(Preference::CurrentVersion);
    let hour_vibrate = store.get(Preference::HourVibrate);
    let bluetooth_vibrate = store.get(Preference::BluetoothVibrate);
    match variant {
        ProtocolVariant::SetupInfo => SettingsMessage {
            current_version,
            installed_version: None,
            hour_vibrate,
            hour_vibrate_start: Some(store.get(Preference::HourVibrateStart)),
            hour_vibrate_end: Some(store.get(Preference::HourVibrateEnd)),
            bluetooth_vibrate,
        },
        ProtocolVariant::Legacy => SettingsMessage {
            current_version,
            installed_version: Some(store.get(Preference::InstalledVersion)),
            hour_vibrate,
            hour_vibrate_start: None,
            hour_vibrate_end: None,
            bluetooth_vibrate,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use serde_json::{Value, json};

    #[test]
    fn test_parse_sparse_device_message() {
        let message: DeviceMessage = serde_json::from_str(r#"{"KEY_CLOCK_24_HOUR":1}"#).unwrap();
        assert_eq!(message.clock_24_hour, Some(1));
        assert_eq!(message.installed_version, None);
        assert_eq!(message.fields(), vec![(Preference::Clock24Hour, 1)]);
    }

    #[test]
    fn test_parse_device_message_with_strings_and_garbage() {
        let message: DeviceMessage = serde_json::from_str(
            r#"{"KEY_INSTALLED_VERSION":"4","KEY_CLOCK_24_HOUR":"yes","KEY_UNKNOWN":3}"#,
        )
        .unwrap();
        assert_eq!(message.installed_version, Some(4));
        assert_eq!(message.clock_24_hour, None);
    }

    #[test]
    fn test_empty_device_message() {
        let message: DeviceMessage = serde_json::from_str("{}").unwrap();
        assert!(message.is_empty());
        assert!(message.fields().is_empty());
    }

    #[test]
    fn test_setup_info_request_wire_format() {
        let value: Value = serde_json::from_slice(&make_setup_info_request().to_bytes().unwrap())
            .unwrap();
        assert_eq!(value, json!({"KEY_REQUEST_SETUP_INFO": 0}));
    }

    #[test]
    fn test_settings_message_fields_per_variant() {
        let store = SettingsStore::new(MemoryStorage::new());
        store.set(Preference::CurrentVersion, 3);
        store.set(Preference::InstalledVersion, 2);

        let current = OutboundMessage::Settings(make_settings_message(
            &store,
            ProtocolVariant::SetupInfo,
        ));
        let value: Value = serde_json::from_slice(&current.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "KEY_CURRENT_VERSION": 3,
                "KEY_HOUR_VIBRATE": 0,
                "KEY_HOUR_VIBRATE_START": 9,
                "KEY_HOUR_VIBRATE_END": 18,
                "KEY_BLUETOOTH_VIBRATE": 1
            })
        );

        let legacy =
            OutboundMessage::Settings(make_settings_message(&store, ProtocolVariant::Legacy));
        let value: Value = serde_json::from_slice(&legacy.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "KEY_CURRENT_VERSION": 3,
                "KEY_INSTALLED_VERSION": 2,
                "KEY_HOUR_VIBRATE": 0,
                "KEY_BLUETOOTH_VIBRATE": 1
            })
        );
    }
}
