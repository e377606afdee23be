use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};

use crate::error::TsundokuError;
use crate::models::{ContentRecord, ImageRecord};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

/// SQLite-backed storage for the collection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, TsundokuError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, TsundokuError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Content CRUD ────────────────────────────────────────────

    /// Insert a record and its images, returning the new content ID.
    pub fn insert_content(&self, content: &ContentRecord) -> Result<i64, TsundokuError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO content (title, favourite, queued, cover_image_url, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                content.title,
                content.favourite,
                content.queued,
                content.cover_image_url,
                content.added_at.to_rfc3339(),
            ],
        )?;
        let content_id = tx.last_insert_rowid();
        for img in &content.images {
            tx.execute(
                "INSERT INTO image_file (content_id, \"order\", url, is_cover)
                 VALUES (?1, ?2, ?3, ?4)",
                params![content_id, img.order, img.url, img.is_cover],
            )?;
        }
        tx.commit()?;
        Ok(content_id)
    }

    /// Fetch the records matching `ids`, ordered by ID. Unknown IDs are
    /// skipped.
    pub fn select_content(&self, ids: &[i64]) -> Result<Vec<ContentRecord>, TsundokuError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, title, favourite, queued, cover_image_url, added_at
             FROM content WHERE id IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(params_from_iter(ids.iter()), |row| Ok(row_to_content(row)))?
            .collect::<Result<Vec<_>, _>>()?;

        for record in &mut records {
            record.images = self.images_for(record.id)?;
        }
        Ok(records)
    }

    fn images_for(&self, content_id: i64) -> Result<Vec<ImageRecord>, TsundokuError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_id, \"order\", url, is_cover
             FROM image_file WHERE content_id = ?1 ORDER BY \"order\"",
        )?;
        let images = stmt
            .query_map(params![content_id], |row| Ok(row_to_image(row)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    /// IDs of every stored record, optionally leaving out favourites and
    /// records still in the download queue.
    pub fn stored_content_ids(
        &self,
        non_favourites_only: bool,
        include_queued: bool,
    ) -> Result<Vec<i64>, TsundokuError> {
        let mut sql = String::from("SELECT id FROM content WHERE 1=1");
        if non_favourites_only {
            sql.push_str(" AND favourite = 0");
        }
        if !include_queued {
            sql.push_str(" AND queued = 0");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Persist the cover selection of an already stored record.
    pub fn save_cover(&self, content: &ContentRecord) -> Result<(), TsundokuError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE content SET cover_image_url = ?1 WHERE id = ?2",
            params![content.cover_image_url, content.id],
        )?;
        if changed == 0 {
            return Err(TsundokuError::NotFound(format!("content {}", content.id)));
        }
        for img in &content.images {
            tx.execute(
                "UPDATE image_file SET is_cover = ?1 WHERE content_id = ?2 AND \"order\" = ?3",
                params![img.is_cover, content.id, img.order],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_favourite(&self, content_id: i64, favourite: bool) -> Result<(), TsundokuError> {
        self.conn.execute(
            "UPDATE content SET favourite = ?1 WHERE id = ?2",
            params![favourite, content_id],
        )?;
        Ok(())
    }

    /// Delete records (images cascade). Returns the number removed.
    pub fn delete_content(&self, ids: &[i64]) -> Result<usize, TsundokuError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let removed = self.conn.execute(
            &format!("DELETE FROM content WHERE id IN ({placeholders})"),
            params_from_iter(ids.iter()),
        )?;
        Ok(removed)
    }

    pub fn count_content(&self) -> Result<usize, TsundokuError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Hand cached pages back to the allocator.
    pub fn release_memory(&self) -> Result<(), TsundokuError> {
        self.conn.execute_batch("PRAGMA shrink_memory;")?;
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> Result<(), TsundokuError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

/// Parse a datetime string from SQLite (either RFC 3339 or SQLite's `datetime('now')` format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    DateTime::default()
}

fn row_to_content(row: &rusqlite::Row<'_>) -> ContentRecord {
    let added_str: String = row.get(5).unwrap_or_default();
    ContentRecord {
        id: row.get(0).unwrap_or(0),
        title: row.get(1).unwrap_or_default(),
        favourite: row.get::<_, i32>(2).unwrap_or(0) != 0,
        queued: row.get::<_, i32>(3).unwrap_or(0) != 0,
        cover_image_url: row.get(4).unwrap_or(None),
        images: Vec::new(),
        added_at: parse_datetime(&added_str),
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> ImageRecord {
    ImageRecord {
        id: row.get(0).unwrap_or(0),
        content_id: row.get(1).unwrap_or(0),
        order: row.get(2).unwrap_or(0),
        url: row.get(3).unwrap_or_default(),
        is_cover: row.get::<_, i32>(4).unwrap_or(0) != 0,
    }
}
