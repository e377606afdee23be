use serde::{Deserialize, Serialize};

/// A single page/picture belonging to one content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub content_id: i64,
    /// Position within the parent record, unique per record.
    pub order: u32,
    pub url: String,
    pub is_cover: bool,
}

impl ImageRecord {
    /// An unsaved image; `id` and `content_id` are assigned on insert.
    pub fn new(order: u32, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            content_id: 0,
            order,
            url: url.into(),
            is_cover: false,
        }
    }
}
