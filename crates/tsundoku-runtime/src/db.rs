use std::path::Path;

use tokio::sync::{mpsc, oneshot};

use tsundoku_core::error::TsundokuError;
use tsundoku_core::models::ContentRecord;
use tsundoku_core::storage::Storage;

use crate::dao::CollectionDao;

/// Cloneable handle to the database actor thread.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

enum DbCommand {
    InsertContent {
        content: Box<ContentRecord>,
        reply: oneshot::Sender<Result<i64, TsundokuError>>,
    },
    SelectContent {
        ids: Vec<i64>,
        reply: oneshot::Sender<Result<Vec<ContentRecord>, TsundokuError>>,
    },
    StoredContentIds {
        non_favourites_only: bool,
        include_queued: bool,
        reply: oneshot::Sender<Result<Vec<i64>, TsundokuError>>,
    },
    SaveCover {
        content: Box<ContentRecord>,
        reply: oneshot::Sender<Result<(), TsundokuError>>,
    },
    SetFavourite {
        content_id: i64,
        favourite: bool,
        reply: oneshot::Sender<Result<(), TsundokuError>>,
    },
    DeleteContent {
        ids: Vec<i64>,
        reply: oneshot::Sender<Result<usize, TsundokuError>>,
    },
    ReleaseMemory,
}

impl DbHandle {
    pub fn open(path: &Path) -> Option<Self> {
        let storage = Storage::open(path)
            .map_err(|e| tracing::error!("Failed to open database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    /// Actor over a throwaway in-memory database.
    pub fn open_memory() -> Option<Self> {
        let storage = Storage::open_memory()
            .map_err(|e| tracing::error!("Failed to open in-memory database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    fn spawn(storage: Storage) -> Option<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))
            .map_err(|e| tracing::error!("Failed to spawn DB thread: {e}"))
            .ok()?;

        Some(Self { tx })
    }

    pub async fn insert_content(&self, content: ContentRecord) -> Result<i64, TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::InsertContent {
            content: Box::new(content),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn select_content(&self, ids: Vec<i64>) -> Result<Vec<ContentRecord>, TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::SelectContent { ids, reply });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn stored_content_ids(
        &self,
        non_favourites_only: bool,
        include_queued: bool,
    ) -> Result<Vec<i64>, TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::StoredContentIds {
            non_favourites_only,
            include_queued,
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn save_cover(&self, content: ContentRecord) -> Result<(), TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::SaveCover {
            content: Box::new(content),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn set_favourite(&self, content_id: i64, favourite: bool) -> Result<(), TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::SetFavourite {
            content_id,
            favourite,
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    pub async fn delete_content(&self, ids: Vec<i64>) -> Result<usize, TsundokuError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::DeleteContent { ids, reply });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }
}

impl CollectionDao for DbHandle {
    async fn select_content(&self, ids: Vec<i64>) -> Result<Vec<ContentRecord>, TsundokuError> {
        DbHandle::select_content(self, ids).await
    }

    async fn stored_content_ids(
        &self,
        non_favourites_only: bool,
        include_queued: bool,
    ) -> Result<Vec<i64>, TsundokuError> {
        DbHandle::stored_content_ids(self, non_favourites_only, include_queued).await
    }

    async fn save_content(&self, content: ContentRecord) -> Result<(), TsundokuError> {
        self.save_cover(content).await
    }

    fn cleanup(&self) {
        let _ = self.tx.send(DbCommand::ReleaseMemory);
    }
}

fn actor_closed() -> TsundokuError {
    TsundokuError::Config("DB actor closed".into())
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::InsertContent { content, reply } => {
                let _ = reply.send(storage.insert_content(&content));
            }
            DbCommand::SelectContent { ids, reply } => {
                let _ = reply.send(storage.select_content(&ids));
            }
            DbCommand::StoredContentIds {
                non_favourites_only,
                include_queued,
                reply,
            } => {
                let _ = reply.send(storage.stored_content_ids(non_favourites_only, include_queued));
            }
            DbCommand::SaveCover { content, reply } => {
                let _ = reply.send(storage.save_cover(&content));
            }
            DbCommand::SetFavourite {
                content_id,
                favourite,
                reply,
            } => {
                let _ = reply.send(storage.set_favourite(content_id, favourite));
            }
            DbCommand::DeleteContent { ids, reply } => {
                let _ = reply.send(storage.delete_content(&ids));
            }
            DbCommand::ReleaseMemory => {
                if let Err(e) = storage.release_memory() {
                    tracing::warn!(error = %e, "Failed to release database memory");
                }
            }
        }
    }
    tracing::debug!("DB actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsundoku_core::models::ImageRecord;

    fn book(title: &str, pages: u32) -> ContentRecord {
        let mut record = ContentRecord::new(title);
        record.images = (0..pages)
            .map(|i| ImageRecord::new(i, format!("{title}/{i}.png")))
            .collect();
        record
    }

    #[tokio::test]
    async fn test_actor_roundtrip() {
        let db = DbHandle::open_memory().unwrap();
        let a = db.insert_content(book("a", 2)).await.unwrap();
        let b = db.insert_content(book("b", 3)).await.unwrap();
        db.set_favourite(b, true).await.unwrap();

        let records = db.select_content(vec![a, b]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].images.len(), 3);

        assert_eq!(db.stored_content_ids(true, false).await.unwrap(), vec![a]);
        assert_eq!(db.delete_content(vec![a]).await.unwrap(), 1);
        assert!(db.select_content(vec![a]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dao_save_content() {
        let db = DbHandle::open_memory().unwrap();
        let id = db.insert_content(book("c", 3)).await.unwrap();
        let mut record = db.select_content(vec![id]).await.unwrap().remove(0);
        record.select_cover(1);

        CollectionDao::save_content(&db, record).await.unwrap();
        db.cleanup();

        let reloaded = db.select_content(vec![id]).await.unwrap().remove(0);
        assert_eq!(reloaded.cover_image_url.as_deref(), Some("c/1.png"));
    }
}
