mod controller;
mod dao;
mod db;
mod editor;
mod host;
pub mod screen;
mod status;
#[cfg(test)]
mod test_support;

pub use controller::{PreferenceController, IMPORT_RUNNING};
pub use dao::CollectionDao;
pub use db::DbHandle;
pub use editor::MetadataEditor;
pub use host::{Confirmation, Decision, SettingsHost, SubFlow, ToastKind};
pub use status::{BusyGuard, Service, ServiceFlags, ServiceStatus};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("edit session already closed")]
    Closed,
}
