//! Typed integer access over a string key/value storage.

mod preferences;
mod storage;

pub use preferences::Preference;
pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage};

use std::sync::Arc;

use tracing::warn;

use crate::coerce::parse_int;

pub struct SettingsStore<S: KeyValueStorage> {
    storage: Arc<S>,
}

impl<S: KeyValueStorage> Clone for SettingsStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: KeyValueStorage> SettingsStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Stored value of `name` coerced to an integer, or `default` when the
    /// value is absent or not numeric.
    pub fn get_int(&self, name: &str, default: i32) -> i32 {
        self.storage
            .get_item(name)
            .and_then(|v| parse_int(&v))
            .unwrap_or(default)
    }

    /// Stores `value` as a decimal string. A failing backend is logged and
    /// otherwise ignored.
    pub fn set_int(&self, name: &str, value: i32) {
        if let Err(e) = self.storage.set_item(name, value.to_string()) {
            warn!("Failed to persist {}={}: {}", name, value, e);
        }
    }

    pub fn get(&self, preference: Preference) -> i32 {
        self.get_int(preference.key(), preference.default_value())
    }

    pub fn set(&self, preference: Preference, value: i32) {
        self.set_int(preference.key(), value)
    }

    /// Every preference with its current value, in declaration order.
    pub fn snapshot(&self) -> Vec<(Preference, i32)> {
        Preference::ALL.iter().map(|p| (*p, self.get(*p))).collect()
    }

    /// `key=value` lines for display.
    pub fn describe(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .map(|(p, v)| format!("{p}={v}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore<MemoryStorage> {
        SettingsStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_unset_values_fall_back_to_default() {
        let store = store();
        for preference in Preference::ALL {
            assert_eq!(store.get(preference), preference.default_value());
        }
        assert_eq!(store.get_int("anything", 42), 42);
    }

    #[test]
    fn test_last_write_wins() {
        let store = store();
        for preference in Preference::ALL {
            store.set(preference, 5);
            store.set(preference, 7);
            assert_eq!(store.get(preference), 7);
        }
    }

    #[test]
    fn test_non_numeric_storage_uses_default() {
        let storage = MemoryStorage::new();
        storage.set_item("hourVibrateStart", "NaN".to_string()).unwrap();
        storage.set_item("hourVibrateEnd", "20h".to_string()).unwrap();
        let store = SettingsStore::new(storage);

        assert_eq!(store.get(Preference::HourVibrateStart), 9);
        assert_eq!(store.get(Preference::HourVibrateEnd), 20);
    }

    #[test]
    fn test_values_are_stored_as_decimal_strings() {
        let store = store();
        store.set(Preference::InstalledVersion, 12);
        assert_eq!(
            store.storage.get_item("installedVersion").as_deref(),
            Some("12")
        );
    }

    #[test]
    fn test_describe_lists_every_preference() {
        let lines = store().describe();
        assert_eq!(lines.len(), Preference::ALL.len());
        assert_eq!(lines[0], "installedVersion=0");
        assert_eq!(lines[3], "hourVibrateStart=9");
    }

    #[test]
    fn test_clones_share_storage() {
        let store = store();
        let other = store.clone();
        other.set(Preference::Clock24Hour, 1);
        assert_eq!(store.get(Preference::Clock24Hour), 1);
    }

    #[test]
    fn test_failed_persist_is_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = SettingsStore::new(JsonFileStorage::open(blocker.join("preferences.json")));

        store.set(Preference::HourVibrateStart, 6);
        assert_eq!(store.get(Preference::HourVibrateStart), 6);
    }
}
