//! Settings page URL construction and the launchers that open it.

use tracing::{debug, info};
use url::Url;

use crate::error::BridgeError;
use crate::protocol::ProtocolVariant;
use crate::store::{KeyValueStorage, SettingsStore};

pub const DEFAULT_SETTINGS_PAGE: &str = "http://www.sherbeck.com/pebble/fillerup-dev.html";
const RETURN_TO: &str = "return_to";

/// Opens the settings page. Opening is fire-and-forget, the page reports back
/// through a separate close event.
pub trait SettingsPage: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), BridgeError>;
}

impl<P: SettingsPage + ?Sized> SettingsPage for Box<P> {
    fn open(&self, url: &Url) -> Result<(), BridgeError> {
        (**self).open(url)
    }
}

/// Prints the URL so the user can open it by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPage;

impl SettingsPage for LogPage {
    fn open(&self, url: &Url) -> Result<(), BridgeError> {
        info!("Settings page ready at {}", url);
        println!("Open the settings page: {url}");
        Ok(())
    }
}

/// Spawns a command with the URL appended as its last argument, such as
/// `xdg-open` or `open`.
#[derive(Debug, Clone)]
pub struct CommandPage {
    program: String,
    args: Vec<String>,
}

impl CommandPage {
    pub fn new(command: &[String]) -> Result<Self, BridgeError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| BridgeError::Config("page opener command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl SettingsPage for CommandPage {
    fn open(&self, url: &Url) -> Result<(), BridgeError> {
        debug!("Running {} {:?} {}", self.program, self.args, url);
        tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(url.as_str())
            .spawn()?;
        Ok(())
    }
}

/// Query string carrying the stored values the page pre-fills, e.g.
/// `installedVersion=0&hourVibrate=0&...`.
pub fn format_url_variables<S: KeyValueStorage>(
    store: &SettingsStore<S>,
    variant: ProtocolVariant,
) -> String {
    variant
        .url_preferences()
        .iter()
        .map(|p| format!("{}={}", p.key(), store.get(*p)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn settings_url<S: KeyValueStorage>(
    page: &Url,
    store: &SettingsStore<S>,
    variant: ProtocolVariant,
    return_to: Option<&str>,
) -> Url {
    let mut url = page.clone();
    url.set_query(Some(&format_url_variables(store, variant)));
    if let Some(return_to) = return_to {
        url.query_pairs_mut().append_pair(RETURN_TO, return_to);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStorage, Preference};

    fn page() -> Url {
        Url::parse(DEFAULT_SETTINGS_PAGE).unwrap()
    }

    #[test]
    fn test_fresh_store_query() {
        let store = SettingsStore::new(MemoryStorage::new());
        assert_eq!(
            format_url_variables(&store, ProtocolVariant::SetupInfo),
            "installedVersion=0&hourVibrate=0&hourVibrateStart=9&hourVibrateEnd=18&bluetoothVibrate=1&clock24Hour=0"
        );
    }

    #[test]
    fn test_legacy_query() {
        let store = SettingsStore::new(MemoryStorage::new());
        store.set(Preference::InstalledVersion, 2);
        assert_eq!(
            format_url_variables(&store, ProtocolVariant::Legacy),
            "installedVersion=2&hourVibrate=0&bluetoothVibrate=1"
        );
    }

    #[test]
    fn test_url_with_return_to() {
        let store = SettingsStore::new(MemoryStorage::new());
        store.set(Preference::Clock24Hour, 1);
        let url = settings_url(
            &page(),
            &store,
            ProtocolVariant::SetupInfo,
            Some("http://127.0.0.1:8080/close"),
        );
        assert_eq!(
            url.as_str(),
            "http://www.sherbeck.com/pebble/fillerup-dev.html?installedVersion=0&hourVibrate=0&hourVibrateStart=9&hourVibrateEnd=18&bluetoothVibrate=1&clock24Hour=1&return_to=http%3A%2F%2F127.0.0.1%3A8080%2Fclose"
        );
    }

    #[test]
    fn test_url_replaces_existing_query() {
        let store = SettingsStore::new(MemoryStorage::new());
        let base = Url::parse("https://example.org/settings.html?stale=1").unwrap();
        let url = settings_url(&base, &store, ProtocolVariant::Legacy, None);
        assert_eq!(url.query(), Some("installedVersion=0&hourVibrate=0&bluetoothVibrate=1"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(CommandPage::new(&[]).is_err());
        assert!(CommandPage::new(&["xdg-open".to_string()]).is_ok());
    }
}
