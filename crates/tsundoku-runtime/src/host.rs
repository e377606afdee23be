use serde::Serialize;
use tokio::sync::oneshot;

use tsundoku_core::config::ColorTheme;

/// Kind of toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Screens and dialogs the settings screen can open. Each one runs on its
/// own once launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum SubFlow {
    /// Library refresh dialog. `rename` is set when the user is moving the
    /// storage folder rather than rescanning it.
    LibraryRefresh { refresh: bool, rename: bool },
    LibraryExport,
    LibraryImport,
    /// Delete the given content IDs.
    LibraryDelete { ids: Vec<i64> },
    AppLock,
    UpdateCheck { manual: bool },
    /// A nested settings screen.
    SettingsScreen { key: String },
}

/// Questions put to the user before a destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteAllExceptFavourites { count: usize },
}

impl Confirmation {
    pub fn message(&self) -> String {
        match self {
            Self::DeleteAllExceptFavourites { count } => {
                format!("Delete {count} book(s) that are not favourites? This cannot be undone.")
            }
        }
    }
}

/// Outcome of a [`Confirmation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
}

/// The UI hosting the settings screen.
pub trait SettingsHost: Send + Sync {
    fn toast(&self, message: &str, kind: ToastKind);

    fn apply_theme(&self, theme: ColorTheme);

    /// Update the summary line shown under a settings item.
    fn set_summary(&self, key: &str, summary: Option<&str>);

    fn launch(&self, flow: SubFlow);

    /// Ask the user; the answer arrives on the returned channel. Dropping
    /// the sender counts as [`Decision::Cancelled`].
    fn confirm(&self, request: Confirmation) -> oneshot::Receiver<Decision>;
}
