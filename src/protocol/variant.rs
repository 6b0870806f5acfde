use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::Preference;

/// Which watch face generation the bridge is talking to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    /// Current watch faces: the settings page is gated on a setup-info
    /// handshake and vibrate windows are configurable.
    #[default]
    SetupInfo,
    /// Older watch faces that never answer setup-info requests and expect the
    /// installed version echoed back.
    Legacy,
}

const SETUP_INFO_URL: [Preference; 6] = [
    Preference::InstalledVersion,
    Preference::HourVibrate,
    Preference::HourVibrateStart,
    Preference::HourVibrateEnd,
    Preference::BluetoothVibrate,
    Preference::Clock24Hour,
];

const LEGACY_URL: [Preference; 3] = [
    Preference::InstalledVersion,
    Preference::HourVibrate,
    Preference::BluetoothVibrate,
];

impl ProtocolVariant {
    pub fn requests_setup_info(&self) -> bool {
        matches!(self, ProtocolVariant::SetupInfo)
    }

    /// Preferences passed to the settings page, in query string order.
    pub fn url_preferences(&self) -> &'static [Preference] {
        match self {
            ProtocolVariant::SetupInfo => &SETUP_INFO_URL,
            ProtocolVariant::Legacy => &LEGACY_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVariant::SetupInfo => "setup-info",
            ProtocolVariant::Legacy => "legacy",
        }
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "setup-info" | "setup_info" | "current" => Ok(ProtocolVariant::SetupInfo),
            "legacy" => Ok(ProtocolVariant::Legacy),
            _ => Err(format!(
                "Invalid protocol variant '{}'. Valid options: setup-info, legacy",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant() {
        assert_eq!(
            "setup-info".parse::<ProtocolVariant>().unwrap(),
            ProtocolVariant::SetupInfo
        );
        assert_eq!(
            "LEGACY".parse::<ProtocolVariant>().unwrap(),
            ProtocolVariant::Legacy
        );
        assert!("v3".parse::<ProtocolVariant>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProtocolVariant::SetupInfo).unwrap(),
            "\"setup-info\""
        );
        assert_eq!(
            serde_json::from_str::<ProtocolVariant>("\"legacy\"").unwrap(),
            ProtocolVariant::Legacy
        );
    }
}
