use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImageRecord;

/// A stored book/gallery with its images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub title: String,
    pub favourite: bool,
    /// Still sitting in the download queue.
    pub queued: bool,
    pub cover_image_url: Option<String>,
    pub images: Vec<ImageRecord>,
    pub added_at: DateTime<Utc>,
}

impl ContentRecord {
    /// An unsaved record with no images.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            favourite: false,
            queued: false,
            cover_image_url: None,
            images: Vec::new(),
            added_at: Utc::now(),
        }
    }

    /// The image currently flagged as cover, if any.
    pub fn cover(&self) -> Option<&ImageRecord> {
        self.images.iter().find(|img| img.is_cover)
    }

    pub fn image_at(&self, order: u32) -> Option<&ImageRecord> {
        self.images.iter().find(|img| img.order == order)
    }

    /// Flag the image at `order` as the sole cover and point
    /// `cover_image_url` at it.
    ///
    /// With no image at `order` every flag is cleared and the URL unset.
    /// Returns whether an image matched.
    pub fn select_cover(&mut self, order: u32) -> bool {
        let mut url = None;
        for img in &mut self.images {
            img.is_cover = img.order == order;
            if img.is_cover {
                url = Some(img.url.clone());
            }
        }
        let matched = url.is_some();
        self.cover_image_url = url;
        matched
    }
}
