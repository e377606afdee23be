//! Hand-written fakes for the collaborator traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use tsundoku_core::config::ColorTheme;
use tsundoku_core::error::TsundokuError;
use tsundoku_core::models::{ContentRecord, ImageRecord};

use crate::dao::CollectionDao;
use crate::host::{Confirmation, Decision, SettingsHost, SubFlow, ToastKind};

/// Build a record with `pages` images, the first one flagged as cover.
pub fn book(id: i64, pages: u32) -> ContentRecord {
    let mut record = ContentRecord::new(format!("book-{id}"));
    record.id = id;
    record.images = (0..pages)
        .map(|order| ImageRecord {
            id: id * 100 + i64::from(order),
            content_id: id,
            order,
            url: format!("book-{id}/{order:03}.jpg"),
            is_cover: order == 0,
        })
        .collect();
    record.cover_image_url = record.images.first().map(|img| img.url.clone());
    record
}

#[derive(Default)]
pub struct FakeDao {
    pub records: Vec<ContentRecord>,
    pub stored_ids: Vec<i64>,
    pub fail_ids_query: bool,
    /// When set, `stored_content_ids` waits for this before answering.
    pub gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub selected: Mutex<Vec<Vec<i64>>>,
    pub id_queries: Mutex<Vec<(bool, bool)>>,
    pub saved: Mutex<Vec<ContentRecord>>,
    pub cleanups: AtomicUsize,
}

impl FakeDao {
    pub fn with_records(records: Vec<ContentRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_stored_ids(ids: Vec<i64>) -> Self {
        Self {
            stored_ids: ids,
            ..Default::default()
        }
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

impl CollectionDao for FakeDao {
    async fn select_content(&self, ids: Vec<i64>) -> Result<Vec<ContentRecord>, TsundokuError> {
        let found = self
            .records
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect();
        self.selected.lock().unwrap().push(ids);
        Ok(found)
    }

    async fn stored_content_ids(
        &self,
        non_favourites_only: bool,
        include_queued: bool,
    ) -> Result<Vec<i64>, TsundokuError> {
        self.id_queries
            .lock()
            .unwrap()
            .push((non_favourites_only, include_queued));
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_ids_query {
            return Err(TsundokuError::Config("database is locked".into()));
        }
        Ok(self.stored_ids.clone())
    }

    async fn save_content(&self, content: ContentRecord) -> Result<(), TsundokuError> {
        self.saved.lock().unwrap().push(content);
        Ok(())
    }

    fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Toast(String, ToastKind),
    Theme(ColorTheme),
    Summary(String, Option<String>),
    Launch(SubFlow),
    Confirm(Confirmation),
}

/// Host that records every call. Confirmations are answered with `answer`
/// if set, otherwise parked in `waiting`.
#[derive(Default)]
pub struct RecordingHost {
    pub seen: Mutex<Vec<Seen>>,
    pub answer: Mutex<Option<Decision>>,
    pub waiting: Mutex<Vec<oneshot::Sender<Decision>>>,
}

impl RecordingHost {
    pub fn answering(decision: Decision) -> Self {
        Self {
            answer: Mutex::new(Some(decision)),
            ..Default::default()
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<SubFlow> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Launch(flow) => Some(flow),
                _ => None,
            })
            .collect()
    }

    pub fn toasts(&self) -> Vec<(String, ToastKind)> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Toast(msg, kind) => Some((msg, kind)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, seen: Seen) {
        self.seen.lock().unwrap().push(seen);
    }
}

impl SettingsHost for RecordingHost {
    fn toast(&self, message: &str, kind: ToastKind) {
        self.record(Seen::Toast(message.to_string(), kind));
    }

    fn apply_theme(&self, theme: ColorTheme) {
        self.record(Seen::Theme(theme));
    }

    fn set_summary(&self, key: &str, summary: Option<&str>) {
        self.record(Seen::Summary(key.to_string(), summary.map(str::to_string)));
    }

    fn launch(&self, flow: SubFlow) {
        self.record(Seen::Launch(flow));
    }

    fn confirm(&self, request: Confirmation) -> oneshot::Receiver<Decision> {
        self.record(Seen::Confirm(request));
        let (tx, rx) = oneshot::channel();
        let answer = *self.answer.lock().unwrap();
        match answer {
            Some(decision) => {
                let _ = tx.send(decision);
            }
            None => self.waiting.lock().unwrap().push(tx),
        }
        rx
    }
}
