use std::sync::Arc;

use tokio::sync::watch;

use tsundoku_core::models::ContentRecord;

use crate::dao::CollectionDao;
use crate::RuntimeError;

/// Working set behind the metadata edit screen.
///
/// Observers subscribe through [`MetadataEditor::content`] and re-render on
/// every publish. Edits stay in memory until [`MetadataEditor::save`].
pub struct MetadataEditor<D: CollectionDao> {
    dao: Arc<D>,
    working_set: watch::Sender<Vec<ContentRecord>>,
    closed: bool,
}

impl<D: CollectionDao> MetadataEditor<D> {
    pub fn new(dao: Arc<D>) -> Self {
        let (working_set, _) = watch::channel(Vec::new());
        Self {
            dao,
            working_set,
            closed: false,
        }
    }

    pub fn content(&self) -> watch::Receiver<Vec<ContentRecord>> {
        self.working_set.subscribe()
    }

    /// Snapshot of the current working set.
    pub fn current(&self) -> Vec<ContentRecord> {
        self.working_set.borrow().clone()
    }

    /// Replace the working set with the records for `ids`.
    ///
    /// Non-positive IDs are placeholders and are dropped before querying.
    /// A failed query is logged and leaves the working set as it was.
    pub async fn load_content(&mut self, ids: &[i64]) {
        if self.closed {
            return;
        }
        let valid: Vec<i64> = ids.iter().copied().filter(|&id| id > 0).collect();
        if valid.len() < ids.len() {
            tracing::debug!(
                dropped = ids.len() - valid.len(),
                "Ignoring non-positive content IDs"
            );
        }

        let records = if valid.is_empty() {
            Vec::new()
        } else {
            match self.dao.select_content(valid).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load content for editing");
                    return;
                }
            }
        };
        self.working_set.send_replace(records);
    }

    /// Make the image at `order` the cover of the first record and
    /// republish. An unknown order leaves the record with no cover.
    pub fn set_cover(&mut self, order: u32) {
        if self.closed {
            return;
        }
        self.working_set.send_modify(|set| {
            if let Some(content) = set.first_mut() {
                if !content.select_cover(order) {
                    tracing::debug!(
                        content_id = content.id,
                        order,
                        "No image at that position, cover cleared"
                    );
                }
            }
        });
    }

    /// Persist the first record's cover selection.
    pub async fn save(&self) -> Result<(), RuntimeError> {
        if self.closed {
            return Err(RuntimeError::Closed);
        }
        let Some(content) = self.working_set.borrow().first().cloned() else {
            return Err(RuntimeError::NotFound("nothing loaded".into()));
        };
        self.dao
            .save_content(content)
            .await
            .map_err(|e| RuntimeError::Database(e.to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// End the edit session and release the DAO. Idempotent.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.dao.cleanup();
    }
}

impl<D: CollectionDao> Drop for MetadataEditor<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
