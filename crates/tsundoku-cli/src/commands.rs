use std::path::Path;
use std::sync::Arc;

use tsundoku_core::config::AppConfig;
use tsundoku_core::error::TsundokuError;
use tsundoku_core::models::{ContentRecord, ImageRecord};
use tsundoku_core::settings::{PreferenceSource, PreferenceValue, SettingsStore};
use tsundoku_runtime::screen::{self, Section};
use tsundoku_runtime::{
    DbHandle, MetadataEditor, PreferenceController, RuntimeError, Service, ServiceFlags,
    SubFlow,
};

use crate::cli::{Cli, Command, EditCommand, LibraryCommand, SettingsCommand};
use crate::host::ConsoleHost;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] TsundokuError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to open database at {0}")]
    Database(String),
    #[error("unknown settings screen: {0}")]
    UnknownScreen(String),
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    #[error("no content with id {0}")]
    MissingContent(i64),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let store = Arc::new(match &cli.config {
        Some(path) => SettingsStore::open(path)?,
        None => SettingsStore::load()?,
    });
    let db_path = match cli.db {
        Some(path) => path,
        None => AppConfig::ensure_db_path()?,
    };

    match cli.command {
        Command::Settings(cmd) => settings(cmd, store, &db_path).await,
        Command::Library(cmd) => library(cmd, &open_db(&db_path)?).await,
        Command::Edit(cmd) => edit(cmd, open_db(&db_path)?).await,
    }
}

fn open_db(path: &Path) -> Result<DbHandle, CliError> {
    DbHandle::open(path).ok_or_else(|| CliError::Database(path.display().to_string()))
}

/// The screen an item lives on, so screen-scoped reactions fire.
fn screen_of(key: &str) -> Option<&'static str> {
    screen::SECTIONS
        .iter()
        .find(|s| s.contains(key))
        .map(|s| s.key)
}

// ── Settings ────────────────────────────────────────────────────

async fn settings(
    cmd: SettingsCommand,
    store: Arc<SettingsStore>,
    db_path: &Path,
) -> Result<(), CliError> {
    match cmd {
        SettingsCommand::Show { screen: key } => {
            let section = match key {
                Some(key) => screen::find(&key).ok_or(CliError::UnknownScreen(key))?,
                None => screen::root(),
            };
            print_section(section, store.as_ref());
            Ok(())
        }
        SettingsCommand::Get { key } => {
            let value = store.get(&key).ok_or(CliError::UnknownKey(key))?;
            println!("{value}");
            Ok(())
        }
        SettingsCommand::Set { key, value } => {
            let value = PreferenceValue::parse_for(&key, &value)?;
            let host = Arc::new(ConsoleHost::new(false));
            let mut controller = PreferenceController::new(
                store.clone(),
                Arc::new(ServiceFlags::new()),
                Arc::new(open_db(db_path)?),
                host,
            );
            controller.on_screen_shown(screen_of(&key));
            controller.on_settings_visible();
            store.set(&key, value)?;
            controller.process_pending_changes();
            controller.teardown();
            Ok(())
        }
        SettingsCommand::Activate { key, yes } => {
            let db = open_db(db_path)?;
            let host = Arc::new(ConsoleHost::new(yes));
            let services = ServiceFlags::new();
            let mut controller = PreferenceController::new(
                store,
                Arc::new(services.clone()),
                Arc::new(db.clone()),
                host.clone(),
            );
            controller.on_screen_shown(screen_of(&key));
            if !controller.on_item_activated(&key) {
                return Err(CliError::UnknownKey(key));
            }
            controller.wait_pending().await;
            controller.teardown();

            for flow in host.take_launched() {
                run_flow(flow, &db, &services).await?;
            }
            Ok(())
        }
    }
}

fn print_section(section: &Section, store: &SettingsStore) {
    println!("{}", section.title);
    for item in section.items {
        match store.get(item) {
            Some(value) => println!("  {item} = {value}"),
            None => println!("  {item}"),
        }
    }
    for child in section.children {
        println!("  > {child}");
    }
}

/// Carry out the flows the terminal can handle itself.
///
/// Library mutations run under the import flag so the controller sees the
/// library as busy while they are in progress.
async fn run_flow(flow: SubFlow, db: &DbHandle, services: &ServiceFlags) -> Result<(), CliError> {
    match flow {
        SubFlow::LibraryDelete { ids } => {
            let Some(_busy) = services.try_start(Service::Import) else {
                println!("{}", tsundoku_runtime::IMPORT_RUNNING);
                return Ok(());
            };
            let removed = db.delete_content(ids).await?;
            println!("Deleted {removed} book(s)");
        }
        SubFlow::LibraryRefresh { rename: true, .. } => {
            println!("Use `tsundoku settings set pref_settings_folder <path>` to move the library");
        }
        SubFlow::SettingsScreen { key } => {
            println!("Use `tsundoku settings show {key}`");
        }
        other => {
            println!("{} is not available from the command line", describe(&other));
        }
    }
    Ok(())
}

fn describe(flow: &SubFlow) -> &'static str {
    match flow {
        SubFlow::LibraryRefresh { .. } => "Library refresh",
        SubFlow::LibraryExport => "Library export",
        SubFlow::LibraryImport => "Library import",
        SubFlow::LibraryDelete { .. } => "Library delete",
        SubFlow::AppLock => "App lock",
        SubFlow::UpdateCheck { .. } => "Update check",
        SubFlow::SettingsScreen { .. } => "Settings screen",
    }
}

// ── Library ─────────────────────────────────────────────────────

async fn library(cmd: LibraryCommand, db: &DbHandle) -> Result<(), CliError> {
    match cmd {
        LibraryCommand::Add {
            title,
            pages,
            favourite,
        } => {
            let mut record = ContentRecord::new(title);
            record.favourite = favourite;
            record.images = (0..pages)
                .map(|order| ImageRecord::new(order, format!("{:04}.jpg", order + 1)))
                .collect();
            record.select_cover(0);
            let id = db.insert_content(record).await?;
            println!("Added content {id}");
        }
        LibraryCommand::List { json } => {
            let ids = db.stored_content_ids(false, true).await?;
            let records = db.select_content(ids).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!(
                        "{:>5}  {}  {:>4}p  {}  (cover: {})",
                        record.id,
                        if record.favourite { "★" } else { " " },
                        record.images.len(),
                        record.title,
                        record.cover_image_url.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        LibraryCommand::Favourite { id, remove } => {
            db.set_favourite(id, !remove).await?;
        }
    }
    Ok(())
}

// ── Edit ────────────────────────────────────────────────────────

async fn edit(cmd: EditCommand, db: DbHandle) -> Result<(), CliError> {
    match cmd {
        EditCommand::Cover { id, order, dry_run } => {
            let mut editor = MetadataEditor::new(Arc::new(db));
            editor.load_content(&[id]).await;

            let Some(record) = editor.current().into_iter().next() else {
                return Err(CliError::MissingContent(id));
            };
            // The editor clears the cover for an unknown position; from the
            // command line that is almost always a typo, so refuse instead.
            if record.image_at(order).is_none() {
                println!(
                    "{} has no page at position {order} ({} pages)",
                    record.title,
                    record.images.len()
                );
                return Ok(());
            }

            editor.set_cover(order);
            let updated = editor.current().remove(0);
            println!(
                "Cover of {} is now {}",
                updated.title,
                updated.cover_image_url.as_deref().unwrap_or("-")
            );
            if !dry_run {
                editor.save().await?;
            }
            editor.teardown();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tsundoku_core::settings::keys;
    use tsundoku_runtime::ServiceStatus;

    use super::*;

    #[test]
    fn test_screen_of() {
        assert_eq!(screen_of(keys::SETTINGS_FOLDER), Some("library"));
        assert_eq!(screen_of(keys::COLOR_THEME), Some(screen::ROOT));
        assert_eq!(screen_of("pref_bogus"), None);
    }

    #[tokio::test]
    async fn test_delete_flow_removes_records() {
        let db = DbHandle::open_memory().unwrap();
        let keep = db.insert_content(ContentRecord::new("keep")).await.unwrap();
        let gone = db.insert_content(ContentRecord::new("gone")).await.unwrap();

        let services = ServiceFlags::new();
        run_flow(SubFlow::LibraryDelete { ids: vec![gone] }, &db, &services)
            .await
            .unwrap();

        let left = db.stored_content_ids(false, true).await.unwrap();
        assert_eq!(left, vec![keep]);
        assert!(!services.is_running(Service::Import));
    }

    #[tokio::test]
    async fn test_delete_flow_waits_for_running_import() {
        let db = DbHandle::open_memory().unwrap();
        let id = db.insert_content(ContentRecord::new("busy")).await.unwrap();
        let services = ServiceFlags::new();
        let import = services.try_start(Service::Import).unwrap();

        run_flow(SubFlow::LibraryDelete { ids: vec![id] }, &db, &services)
            .await
            .unwrap();
        assert_eq!(db.stored_content_ids(false, true).await.unwrap(), vec![id]);

        drop(import);
        run_flow(SubFlow::LibraryDelete { ids: vec![id] }, &db, &services)
            .await
            .unwrap();
        assert!(db.stored_content_ids(false, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_cover_refuses_unknown_position() {
        let db = DbHandle::open_memory().unwrap();
        let mut record = ContentRecord::new("kept");
        record.images = (0..3).map(|i| ImageRecord::new(i, format!("{i}.jpg"))).collect();
        record.select_cover(0);
        let id = db.insert_content(record).await.unwrap();

        let cmd = EditCommand::Cover {
            id,
            order: 9,
            dry_run: false,
        };
        edit(cmd, db.clone()).await.unwrap();

        let stored = db.select_content(vec![id]).await.unwrap().remove(0);
        assert_eq!(stored.cover_image_url.as_deref(), Some("0.jpg"));
        assert_eq!(stored.cover().map(|img| img.order), Some(0));
    }
}
