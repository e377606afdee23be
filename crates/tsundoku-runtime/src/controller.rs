use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use tsundoku_core::config::ColorTheme;
use tsundoku_core::error::TsundokuError;
use tsundoku_core::fs;
use tsundoku_core::settings::{keys, PreferenceSource, PreferenceValue, Subscription};

use crate::dao::CollectionDao;
use crate::host::{Confirmation, Decision, SettingsHost, SubFlow, ToastKind};
use crate::screen::{self, Section};
use crate::status::{Service, ServiceStatus};

/// Notice shown when a library job is refused because an import is running.
pub const IMPORT_RUNNING: &str = "Import is already running";
const RESTART_NEEDED: &str = "Restart the app for this change to take effect";
const NO_MEDIA_CREATED: &str = "No-media file created";
const NO_MEDIA_FAILED: &str = "Could not create the no-media file";
const DELETE_QUERY_FAILED: &str = "Could not list the books to delete";

/// Reacts to settings changes and settings-item activations.
///
/// Owned by the settings screen and driven from its UI task. Item
/// activations may spawn Tokio tasks, so the controller must be used inside
/// a runtime.
pub struct PreferenceController<D: CollectionDao> {
    prefs: Arc<dyn PreferenceSource>,
    services: Arc<dyn ServiceStatus>,
    dao: Arc<D>,
    host: Arc<dyn SettingsHost>,
    screen: &'static Section,
    subscription: Option<Subscription>,
    pending: Vec<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
}

impl<D: CollectionDao> PreferenceController<D> {
    pub fn new(
        prefs: Arc<dyn PreferenceSource>,
        services: Arc<dyn ServiceStatus>,
        dao: Arc<D>,
        host: Arc<dyn SettingsHost>,
    ) -> Self {
        Self {
            prefs,
            services,
            dao,
            host,
            screen: screen::root(),
            subscription: None,
            pending: Vec::new(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The settings screen currently shown.
    pub fn screen(&self) -> &'static Section {
        self.screen
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Show the screen named `root_key`, or the top level. Unknown keys fall
    /// back to the top level.
    pub fn on_screen_shown(&mut self, root_key: Option<&str>) -> &'static Section {
        self.screen = match root_key {
            Some(key) => screen::find(key).unwrap_or_else(|| {
                tracing::warn!(key, "Unknown settings screen, showing top level");
                screen::root()
            }),
            None => screen::root(),
        };
        self.refresh_folder_summary();
        self.screen
    }

    /// Open a screen nested under the current one.
    pub fn navigate_to(&self, key: &str) -> bool {
        if !self.screen.children.contains(&key) {
            return false;
        }
        self.host.launch(SubFlow::SettingsScreen {
            key: key.to_string(),
        });
        true
    }

    pub fn on_settings_visible(&mut self) {
        if self.subscription.is_some() || !self.is_alive() {
            return;
        }
        self.subscription = Some(self.prefs.subscribe());
    }

    /// Stop listening. Changes queued but not yet processed are dropped
    /// together with the receiver.
    pub fn on_settings_hidden(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.prefs.unsubscribe(sub.token);
        }
    }

    /// Release the subscription and cancel in-flight work. Idempotent.
    pub fn teardown(&mut self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        self.on_settings_hidden();
        for task in self.pending.drain(..) {
            task.abort();
        }
        tracing::debug!("Settings screen torn down");
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    // ── Change notifications ────────────────────────────────────

    /// Handle every change queued so far. Returns how many were handled.
    pub fn process_pending_changes(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let change = match self.subscription.as_mut() {
                Some(sub) => match sub.changes.try_recv() {
                    Ok(change) => change,
                    Err(_) => break,
                },
                None => break,
            };
            self.on_preference_changed(&change.key);
            handled += 1;
        }
        handled
    }

    /// Wait for the next change and handle it. Returns `false` once the
    /// subscription is gone.
    pub async fn next_change(&mut self) -> bool {
        let Some(sub) = self.subscription.as_mut() else {
            return false;
        };
        let Some(change) = sub.changes.recv().await else {
            return false;
        };
        self.on_preference_changed(&change.key);
        true
    }

    pub fn on_preference_changed(&self, key: &str) {
        if !self.is_alive() {
            return;
        }
        match key {
            keys::COLOR_THEME => self.apply_color_theme(),
            keys::DL_THREADS_QUANTITY_LISTS | keys::APP_PREVIEW | keys::ANALYTICS => {
                self.host.toast(RESTART_NEEDED, ToastKind::Info);
            }
            keys::SETTINGS_FOLDER | keys::SD_STORAGE_URI => self.refresh_folder_summary(),
            _ => {}
        }
    }

    fn apply_color_theme(&self) {
        let theme = self
            .prefs
            .get(keys::COLOR_THEME)
            .as_ref()
            .and_then(PreferenceValue::as_text)
            .and_then(ColorTheme::from_str_opt);
        match theme {
            Some(theme) => self.host.apply_theme(theme),
            None => tracing::warn!("Color theme preference is missing or invalid"),
        }
    }

    /// Show where the library lives under the storage folder item, when that
    /// item is on the current screen.
    fn refresh_folder_summary(&self) {
        if !self.screen.contains(keys::SETTINGS_FOLDER) {
            return;
        }
        let location = [keys::SETTINGS_FOLDER, keys::SD_STORAGE_URI]
            .iter()
            .find_map(|key| {
                self.prefs
                    .get(key)
                    .and_then(|v| v.as_text().map(str::to_string))
            });
        self.host
            .set_summary(keys::SETTINGS_FOLDER, location.as_deref());
    }

    // ── Item activation ─────────────────────────────────────────

    /// Run the action behind a settings item. Returns `false` for keys this
    /// screen does not handle, leaving them to the host's default handling.
    pub fn on_item_activated(&mut self, key: &str) -> bool {
        match key {
            keys::ADD_NO_MEDIA_FILE => self.create_no_media_marker(),
            keys::CHECK_UPDATE_MANUAL => self.check_for_update(),
            keys::REFRESH_LIBRARY => self.launch_unless_importing(SubFlow::LibraryRefresh {
                refresh: true,
                rename: false,
            }),
            keys::SETTINGS_FOLDER => self.launch_unless_importing(SubFlow::LibraryRefresh {
                refresh: false,
                rename: true,
            }),
            keys::DELETE_ALL_EXCEPT_FAVS => self.delete_all_except_favourites(),
            keys::EXPORT_LIBRARY => self.host.launch(SubFlow::LibraryExport),
            keys::IMPORT_LIBRARY => self.host.launch(SubFlow::LibraryImport),
            keys::APP_LOCK => self.host.launch(SubFlow::AppLock),
            _ => return false,
        }
        true
    }

    fn create_no_media_marker(&self) {
        let folder = self
            .prefs
            .get(keys::SETTINGS_FOLDER)
            .and_then(|v| v.as_text().map(PathBuf::from));
        let result = match folder {
            Some(folder) => fs::create_no_media(&folder),
            None => Err(TsundokuError::Config("no storage folder configured".into())),
        };
        match result {
            Ok(marker) => {
                tracing::info!(path = %marker.display(), "Created no-media marker");
                self.host.toast(NO_MEDIA_CREATED, ToastKind::Success);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create no-media marker");
                self.host.toast(NO_MEDIA_FAILED, ToastKind::Error);
            }
        }
    }

    fn check_for_update(&self) {
        if self.services.is_running(Service::UpdateDownload) {
            tracing::debug!("Update download in progress, skipping manual check");
            return;
        }
        self.host.launch(SubFlow::UpdateCheck { manual: true });
    }

    fn launch_unless_importing(&self, flow: SubFlow) {
        if self.services.is_running(Service::Import) {
            tracing::debug!(?flow, "Import in progress, not launching");
            self.host.toast(IMPORT_RUNNING, ToastKind::Info);
            return;
        }
        self.host.launch(flow);
    }

    /// List non-favourite books in the background, then ask before handing
    /// them to the delete flow. Nothing is shown once the screen is torn
    /// down.
    fn delete_all_except_favourites(&mut self) {
        let dao = Arc::clone(&self.dao);
        let host = Arc::clone(&self.host);
        let alive = Arc::clone(&self.alive);

        self.pending.retain(|task| !task.is_finished());
        self.pending.push(tokio::spawn(async move {
            let result = dao.stored_content_ids(true, false).await;
            if !alive.load(Ordering::Acquire) {
                tracing::debug!("Settings closed before the delete query finished");
                return;
            }
            let ids = match result {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to list non-favourite content");
                    host.toast(DELETE_QUERY_FAILED, ToastKind::Error);
                    return;
                }
            };

            let answer = host.confirm(Confirmation::DeleteAllExceptFavourites { count: ids.len() });
            let decision = answer.await.unwrap_or(Decision::Cancelled);
            if decision == Decision::Confirmed && alive.load(Ordering::Acquire) {
                tracing::info!(count = ids.len(), "Deleting all content except favourites");
                host.launch(SubFlow::LibraryDelete { ids });
            } else {
                tracing::debug!("Delete all except favourites cancelled");
            }
        }));
    }

    /// Wait for background work started by item activations.
    pub async fn wait_pending(&mut self) {
        for task in std::mem::take(&mut self.pending) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Settings task panicked");
                }
            }
        }
    }
}

impl<D: CollectionDao> Drop for PreferenceController<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
