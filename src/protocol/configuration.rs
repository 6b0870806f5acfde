//! Settings page close response.
//!
//! The page returns a URL-component encoded JSON object; `CANCELLED` or no
//! response at all means the user dismissed the page.

use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::value_to_int;
use crate::error::BridgeError;
use crate::store::{KeyValueStorage, Preference, SettingsStore};

pub const CANCELLED: &str = "CANCELLED";

/// Preferences the settings page may return, in persistence order.
pub const PAGE_FIELDS: [Preference; 5] = [
    Preference::CurrentVersion,
    Preference::HourVibrate,
    Preference::HourVibrateStart,
    Preference::HourVibrateEnd,
    Preference::BluetoothVibrate,
];

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationResult {
    pub current_version: Option<i32>,
    pub hour_vibrate: Option<i32>,
    pub hour_vibrate_start: Option<i32>,
    pub hour_vibrate_end: Option<i32>,
    pub bluetooth_vibrate: Option<i32>,
}

impl ConfigurationResult {
    /// Parses a close response. `Ok(None)` when the user cancelled.
    pub fn from_response(response: Option<&str>) -> Result<Option<Self>, BridgeError> {
        let response = match response.map(str::trim) {
            None | Some("") | Some(CANCELLED) => return Ok(None),
            Some(r) => r,
        };
        let decoded = urlencoding::decode(response)
            .map_err(|e| BridgeError::MalformedResponse(format!("invalid encoding: {e}")))?;
        let object = match serde_json::from_str::<Value>(&decoded) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                return Err(BridgeError::MalformedResponse(format!(
                    "expected a JSON object, got {other}"
                )));
            }
            Err(e) => return Err(BridgeError::MalformedResponse(format!("invalid JSON: {e}"))),
        };
        Self::from_object(&object).map(Some)
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, BridgeError> {
        for key in object.keys() {
            if !PAGE_FIELDS.iter().any(|p| p.key() == key) {
                debug!("Ignoring unknown configuration field {key}");
            }
        }
        Ok(Self {
            current_version: field(object, Preference::CurrentVersion)?,
            hour_vibrate: field(object, Preference::HourVibrate)?,
            hour_vibrate_start: field(object, Preference::HourVibrateStart)?,
            hour_vibrate_end: field(object, Preference::HourVibrateEnd)?,
            bluetooth_vibrate: field(object, Preference::BluetoothVibrate)?,
        })
    }

    /// Present fields paired with their preference.
    pub fn entries(&self) -> Vec<(Preference, i32)> {
        PAGE_FIELDS
            .into_iter()
            .zip([
                self.current_version,
                self.hour_vibrate,
                self.hour_vibrate_start,
                self.hour_vibrate_end,
                self.bluetooth_vibrate,
            ])
            .filter_map(|(p, v)| v.map(|v| (p, v)))
            .collect()
    }

    pub fn persist<S: KeyValueStorage>(&self, store: &SettingsStore<S>) {
        for (preference, value) in self.entries() {
            store.set(preference, value);
        }
    }
}

fn field(object: &Map<String, Value>, preference: Preference) -> Result<Option<i32>, BridgeError> {
    let value = match object.get(preference.key()) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let int = value_to_int(value).ok_or_else(|| {
        BridgeError::MalformedResponse(format!("{preference} is not an integer: {value}"))
    })?;
    if !preference.accepts(int) {
        return Err(BridgeError::MalformedResponse(format!(
            "{preference}={int} is outside {:?}",
            preference.domain()
        )));
    }
    Ok(Some(int))
}
