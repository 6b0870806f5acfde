use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::controller::SyncOptions;
use crate::error::BridgeError;
use crate::page::DEFAULT_SETTINGS_PAGE;
use crate::protocol::{DEFAULT_TOPIC_PREFIX, DeviceLinkOptions, ProtocolVariant};
use crate::web::WebConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub device_id: String,
    pub topic_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            user: None,
            password: None,
            device_id: "pebble".to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub settings_page: String,
    pub variant: ProtocolVariant,
    pub storage_path: String,
    /// Seconds to wait for setup info before opening the page anyway, 0 waits forever.
    pub setup_info_timeout_secs: u64,
    /// Command used to open the settings page; the URL is only printed when unset.
    pub open_command: Option<Vec<String>>,
    /// Public base URL of the callback server, when the page should report back to it.
    pub callback_url: Option<String>,
    pub mqtt: MqttConfig,
    pub web: WebConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            settings_page: DEFAULT_SETTINGS_PAGE.to_string(),
            variant: ProtocolVariant::SetupInfo,
            storage_path: "fillerup-settings.json".to_string(),
            setup_info_timeout_secs: 10,
            open_command: None,
            callback_url: None,
            mqtt: MqttConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Reads a JSON configuration file. A missing or unreadable file falls
    /// back to the defaults, a file that does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, BridgeError> {
        let Some(path) = path else {
            return Ok(BridgeConfig::default());
        };
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e))),
            Err(e) => {
                warn!(
                    "Failed to read config file {}, using defaults: {}",
                    path.display(),
                    e
                );
                Ok(BridgeConfig::default())
            }
        }
    }

    pub fn settings_page_url(&self) -> Result<Url, BridgeError> {
        Url::parse(&self.settings_page)
            .map_err(|e| BridgeError::Config(format!("settings_page {}: {}", self.settings_page, e)))
    }

    pub fn sync_options(&self) -> Result<SyncOptions, BridgeError> {
        Ok(SyncOptions {
            variant: self.variant,
            settings_page: self.settings_page_url()?,
            return_to: self
                .callback_url
                .as_ref()
                .map(|base| format!("{}/close", base.trim_end_matches('/'))),
            setup_info_timeout: (self.setup_info_timeout_secs > 0)
                .then(|| Duration::from_secs(self.setup_info_timeout_secs)),
        })
    }

    pub fn device_link_options(&self) -> Result<DeviceLinkOptions, BridgeError> {
        DeviceLinkOptions::builder()
            .host(self.mqtt.host.clone())
            .port(self.mqtt.port)
            .device_id(self.mqtt.device_id.clone())
            .topic_prefix(self.mqtt.topic_prefix.clone())
            .user(self.mqtt.user.clone())
            .password(self.mqtt.password.clone())
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))
    }
}
