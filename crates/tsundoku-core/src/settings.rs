//! Key/value view over [`AppConfig`] with change notifications.
//!
//! The settings screen talks to preferences by string key, the same way the
//! rest of the app reads them through typed config sections. Every
//! successful [`SettingsStore::set`] that actually changes a value is
//! broadcast to the live subscribers in the order the changes happen.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::config::{AppConfig, ColorTheme};
use crate::error::TsundokuError;

/// Preference and settings-item keys.
pub mod keys {
    // Stored preferences
    pub const COLOR_THEME: &str = "pref_color_theme";
    pub const DL_THREADS_QUANTITY_LISTS: &str = "pref_dl_threads_quantity_lists";
    pub const APP_PREVIEW: &str = "pref_app_preview";
    pub const ANALYTICS: &str = "pref_analytics";
    pub const SETTINGS_FOLDER: &str = "pref_settings_folder";
    pub const SD_STORAGE_URI: &str = "pref_sd_storage_uri";
    pub const APP_LOCK: &str = "pref_app_lock";

    // Action items (no stored value)
    pub const ADD_NO_MEDIA_FILE: &str = "pref_add_no_media_file";
    pub const CHECK_UPDATE_MANUAL: &str = "pref_check_update_manual";
    pub const REFRESH_LIBRARY: &str = "pref_refresh_library";
    pub const DELETE_ALL_EXCEPT_FAVS: &str = "pref_delete_all_except_favs";
    pub const EXPORT_LIBRARY: &str = "pref_export_library";
    pub const IMPORT_LIBRARY: &str = "pref_import_library";

    /// Every key that holds a value in [`crate::config::AppConfig`].
    pub const STORED: &[&str] = &[
        COLOR_THEME,
        DL_THREADS_QUANTITY_LISTS,
        APP_PREVIEW,
        ANALYTICS,
        SETTINGS_FOLDER,
        SD_STORAGE_URI,
        APP_LOCK,
    ];
}

/// A preference value as seen through the key/value interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Unset,
}

impl PreferenceValue {
    /// Parse raw user input into the value type expected for `key`.
    pub fn parse_for(key: &str, raw: &str) -> Result<Self, TsundokuError> {
        let invalid = |reason: &str| TsundokuError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let raw = raw.trim();
        match key {
            keys::APP_PREVIEW | keys::ANALYTICS | keys::APP_LOCK => raw
                .parse::<bool>()
                .map(Self::Bool)
                .map_err(|_| invalid("expected true or false")),
            keys::DL_THREADS_QUANTITY_LISTS => raw
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| invalid("expected an integer")),
            keys::COLOR_THEME | keys::SETTINGS_FOLDER | keys::SD_STORAGE_URI => {
                if raw.is_empty() {
                    Ok(Self::Unset)
                } else {
                    Ok(Self::Text(raw.to_string()))
                }
            }
            _ => Err(TsundokuError::NotFound(format!("preference {key}"))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Unset => f.write_str("<unset>"),
        }
    }
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceChange {
    pub key: String,
    pub value: PreferenceValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Live subscription to a [`PreferenceSource`]. Changes queue up in
/// `changes` until the owner drains them.
#[derive(Debug)]
pub struct Subscription {
    pub token: SubscriptionToken,
    pub changes: mpsc::UnboundedReceiver<PreferenceChange>,
}

/// Read access plus change notifications for preferences.
pub trait PreferenceSource: Send + Sync {
    fn get(&self, key: &str) -> Option<PreferenceValue>;
    fn subscribe(&self) -> Subscription;
    fn unsubscribe(&self, token: SubscriptionToken);
}

/// The app's settings store: an [`AppConfig`] optionally backed by a file.
pub struct SettingsStore {
    config: RwLock<AppConfig>,
    path: Option<PathBuf>,
    listeners: Mutex<Vec<(SubscriptionToken, mpsc::UnboundedSender<PreferenceChange>)>>,
    next_token: AtomicU64,
}

impl SettingsStore {
    /// Load from the user config file; changes are written back to it.
    pub fn load() -> Result<Self, TsundokuError> {
        Self::open(&AppConfig::config_path())
    }

    pub fn open(path: &Path) -> Result<Self, TsundokuError> {
        let config = AppConfig::load_from(path)?;
        Ok(Self::build(config, Some(path.to_path_buf())))
    }

    /// A store that never touches disk.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: AppConfig, path: Option<PathBuf>) -> Self {
        Self {
            config: RwLock::new(config),
            path,
            listeners: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn color_theme(&self) -> ColorTheme {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .appearance
            .color_theme
    }

    pub fn storage_folder(&self) -> Option<PathBuf> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .library
            .storage_folder
            .clone()
    }

    /// Change a preference, persist it, and notify subscribers.
    ///
    /// Setting a key to the value it already holds is accepted silently and
    /// emits nothing.
    pub fn set(&self, key: &str, value: PreferenceValue) -> Result<(), TsundokuError> {
        let stored = {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            if read_pref(&config, key).as_ref() == Some(&value) {
                return Ok(());
            }
            let mut updated = config.clone();
            write_pref(&mut updated, key, &value)?;
            if let Some(path) = &self.path {
                updated.save_to(path)?;
            }
            *config = updated;
            read_pref(&config, key).unwrap_or(PreferenceValue::Unset)
        };

        tracing::debug!(key, value = %stored, "Preference changed");
        self.notify(PreferenceChange {
            key: key.to_string(),
            value: stored,
        });
        Ok(())
    }

    fn notify(&self, change: PreferenceChange) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        // Receivers dropped without unsubscribing are pruned here.
        listeners.retain(|(_, tx)| tx.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PreferenceSource for SettingsStore {
    fn get(&self, key: &str) -> Option<PreferenceValue> {
        read_pref(
            &self.config.read().unwrap_or_else(PoisonError::into_inner),
            key,
        )
    }

    fn subscribe(&self) -> Subscription {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, changes) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token, tx));
        Subscription { token, changes }
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(t, _)| *t != token);
    }
}

fn read_pref(config: &AppConfig, key: &str) -> Option<PreferenceValue> {
    let text = |v: Option<String>| v.map_or(PreferenceValue::Unset, PreferenceValue::Text);
    let value = match key {
        keys::COLOR_THEME => PreferenceValue::Text(config.appearance.color_theme.as_str().into()),
        keys::DL_THREADS_QUANTITY_LISTS => {
            PreferenceValue::Int(i64::from(config.downloads.threads_quantity_lists))
        }
        keys::APP_PREVIEW => PreferenceValue::Bool(config.privacy.app_preview),
        keys::ANALYTICS => PreferenceValue::Bool(config.privacy.analytics),
        keys::SETTINGS_FOLDER => text(
            config
                .library
                .storage_folder
                .as_ref()
                .map(|p| p.display().to_string()),
        ),
        keys::SD_STORAGE_URI => text(config.library.sd_storage_uri.clone()),
        keys::APP_LOCK => PreferenceValue::Bool(config.security.app_lock),
        _ => return None,
    };
    Some(value)
}

fn write_pref(
    config: &mut AppConfig,
    key: &str,
    value: &PreferenceValue,
) -> Result<(), TsundokuError> {
    let mismatch = || TsundokuError::InvalidValue {
        key: key.to_string(),
        reason: format!("unexpected value {value}"),
    };
    match (key, value) {
        (keys::COLOR_THEME, PreferenceValue::Text(s)) => {
            config.appearance.color_theme = ColorTheme::from_str_opt(s).ok_or_else(mismatch)?;
        }
        (keys::DL_THREADS_QUANTITY_LISTS, PreferenceValue::Int(n)) => {
            config.downloads.threads_quantity_lists = u32::try_from(*n).map_err(|_| mismatch())?;
        }
        (keys::APP_PREVIEW, PreferenceValue::Bool(b)) => config.privacy.app_preview = *b,
        (keys::ANALYTICS, PreferenceValue::Bool(b)) => config.privacy.analytics = *b,
        (keys::APP_LOCK, PreferenceValue::Bool(b)) => config.security.app_lock = *b,
        (keys::SETTINGS_FOLDER, PreferenceValue::Text(s)) => {
            config.library.storage_folder = Some(PathBuf::from(s));
        }
        (keys::SETTINGS_FOLDER, PreferenceValue::Unset) => config.library.storage_folder = None,
        (keys::SD_STORAGE_URI, PreferenceValue::Text(s)) => {
            config.library.sd_storage_uri = Some(s.clone());
        }
        (keys::SD_STORAGE_URI, PreferenceValue::Unset) => config.library.sd_storage_uri = None,
        _ if read_pref(config, key).is_none() => {
            return Err(TsundokuError::NotFound(format!("preference {key}")));
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::in_memory(AppConfig::default())
    }

    #[test]
    fn test_get_reads_config_sections() {
        let store = store();
        assert_eq!(
            store.get(keys::COLOR_THEME),
            Some(PreferenceValue::Text("light".into()))
        );
        assert_eq!(store.get(keys::ANALYTICS), Some(PreferenceValue::Bool(true)));
        assert_eq!(store.get(keys::SETTINGS_FOLDER), Some(PreferenceValue::Unset));
        assert_eq!(store.get("pref_nonexistent"), None);
        // Action items carry no value.
        assert_eq!(store.get(keys::REFRESH_LIBRARY), None);
    }

    #[test]
    fn test_every_stored_key_is_readable() {
        let store = store();
        for key in keys::STORED {
            assert!(store.get(key).is_some(), "{key} should be readable");
        }
    }

    #[test]
    fn test_set_notifies_in_order() {
        let store = store();
        let mut sub = store.subscribe();

        store
            .set(keys::COLOR_THEME, PreferenceValue::Text("dark".into()))
            .unwrap();
        store
            .set(keys::APP_PREVIEW, PreferenceValue::Bool(false))
            .unwrap();

        let first = sub.changes.try_recv().unwrap();
        assert_eq!(first.key, keys::COLOR_THEME);
        assert_eq!(first.value, PreferenceValue::Text("dark".into()));
        let second = sub.changes.try_recv().unwrap();
        assert_eq!(second.key, keys::APP_PREVIEW);
        assert!(sub.changes.try_recv().is_err());
        assert_eq!(store.color_theme(), ColorTheme::Dark);
    }

    #[test]
    fn test_set_same_value_is_silent() {
        let store = store();
        let mut sub = store.subscribe();
        store
            .set(keys::ANALYTICS, PreferenceValue::Bool(true))
            .unwrap();
        assert!(sub.changes.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = store();
        let mut sub = store.subscribe();
        store.unsubscribe(sub.token);
        assert_eq!(store.subscriber_count(), 0);

        store
            .set(keys::APP_LOCK, PreferenceValue::Bool(true))
            .unwrap();
        assert!(sub.changes.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let store = store();
        drop(store.subscribe());
        let _live = store.subscribe();
        store
            .set(keys::APP_LOCK, PreferenceValue::Bool(true))
            .unwrap();
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let store = store();
        assert!(matches!(
            store.set(keys::COLOR_THEME, PreferenceValue::Text("sepia".into())),
            Err(TsundokuError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.set(keys::DL_THREADS_QUANTITY_LISTS, PreferenceValue::Int(-1)),
            Err(TsundokuError::InvalidValue { .. })
        ));
        assert!(matches!(
            store.set("pref_bogus", PreferenceValue::Bool(true)),
            Err(TsundokuError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_for() {
        assert_eq!(
            PreferenceValue::parse_for(keys::ANALYTICS, "false").unwrap(),
            PreferenceValue::Bool(false)
        );
        assert_eq!(
            PreferenceValue::parse_for(keys::DL_THREADS_QUANTITY_LISTS, " 4 ").unwrap(),
            PreferenceValue::Int(4)
        );
        assert_eq!(
            PreferenceValue::parse_for(keys::SETTINGS_FOLDER, "").unwrap(),
            PreferenceValue::Unset
        );
        assert!(PreferenceValue::parse_for(keys::APP_PREVIEW, "maybe").is_err());
    }

    #[test]
    fn test_set_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = SettingsStore::open(&path).unwrap();
        store
            .set(
                keys::SETTINGS_FOLDER,
                PreferenceValue::Text("/srv/books".into()),
            )
            .unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.storage_folder(), Some(PathBuf::from("/srv/books")));
    }
}
