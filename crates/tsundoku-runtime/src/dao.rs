use std::future::Future;

use tsundoku_core::error::TsundokuError;
use tsundoku_core::models::ContentRecord;

/// Collection queries the settings screen and the metadata editor rely on.
///
/// [`crate::DbHandle`] is the production implementation.
pub trait CollectionDao: Send + Sync + 'static {
    /// Records for `ids`, in whatever order the store yields them.
    fn select_content(
        &self,
        ids: Vec<i64>,
    ) -> impl Future<Output = Result<Vec<ContentRecord>, TsundokuError>> + Send;

    fn stored_content_ids(
        &self,
        non_favourites_only: bool,
        include_queued: bool,
    ) -> impl Future<Output = Result<Vec<i64>, TsundokuError>> + Send;

    /// Persist the cover selection of `content`.
    fn save_content(
        &self,
        content: ContentRecord,
    ) -> impl Future<Output = Result<(), TsundokuError>> + Send;

    /// Release resources held on behalf of the caller.
    fn cleanup(&self);
}
