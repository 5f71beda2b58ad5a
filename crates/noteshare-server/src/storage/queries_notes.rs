//! Note queries: admitted inserts, counters, listings and per-uploader totals.

use noteshare_core::UploaderTally;
use noteshare_core::admission::{FREE_NOTE_CAP, RATIO_DIVISOR, RATIO_THRESHOLD};
use noteshare_core::db::{DatabaseError, unix_timestamp};

use super::NoteshareDatabase;
use super::models::{Note, NoteTotals, NoteWithUploader};

/// Fields for a new note row.
#[derive(Debug, Clone, Copy)]
pub struct NewNote<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub subject: &'a str,
    pub uploader_id: &'a str,
    pub image_path: &'a str,
    pub file_path: &'a str,
    pub price: i64,
}

/// Insert guarded by the free-upload quota. The subquery sees the
/// uploader's notes as of this statement, and SQLite runs one writer at a
/// time, so two concurrent free uploads cannot both pass.
const INSERT_ADMITTED_NOTE_SQL: &str = "INSERT INTO notes \
     (id, title, subject, uploader_id, image_path, file_path, price, created_at, updated_at) \
     SELECT ?, ?, ?, ?, ?, ?, ?, ?, ? \
     WHERE ? <> 0 OR NOT EXISTS ( \
         SELECT 1 FROM ( \
             SELECT COUNT(*) AS total, COALESCE(SUM(price = 0), 0) AS free \
             FROM notes WHERE uploader_id = ? \
         ) AS t \
         WHERE t.free >= ? OR (t.total >= ? AND t.free >= t.total / ?) \
     )";

const SELECT_WITH_UPLOADER: &str = "SELECT n.*, u.username AS uploader_username, \
     u.profile_picture AS uploader_picture \
     FROM notes n JOIN users u ON u.id = n.uploader_id";

impl NoteshareDatabase {
    /// Insert a note if the uploader's free-note quota allows it.
    ///
    /// Returns `Ok(None)` when the quota refused a free note. Priced notes are
    /// always inserted.
    pub async fn insert_note_admitted(
        &self,
        note: &NewNote<'_>,
    ) -> Result<Option<Note>, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(INSERT_ADMITTED_NOTE_SQL)
            .bind(note.id)
            .bind(note.title)
            .bind(note.subject)
            .bind(note.uploader_id)
            .bind(note.image_path)
            .bind(note.file_path)
            .bind(note.price)
            .bind(now)
            .bind(now)
            .bind(note.price)
            .bind(note.uploader_id)
            .bind(FREE_NOTE_CAP)
            .bind(RATIO_THRESHOLD)
            .bind(RATIO_DIVISOR)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_note(note.id).await.map(Some)
    }

    /// Total and free note counts for an uploader.
    pub async fn uploader_tally(&self, uploader_id: &str) -> Result<UploaderTally, DatabaseError> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(price = 0), 0) FROM notes WHERE uploader_id = ?",
        )
        .bind(uploader_id)
        .fetch_one(self.pool())
        .await?;

        Ok(UploaderTally {
            total: row.0,
            free: row.1,
        })
    }

    /// Get a note by ID.
    pub async fn get_note(&self, id: &str) -> Result<Note, DatabaseError> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Note {id}")))
    }

    /// Get a note with its uploader's public profile.
    pub async fn get_note_with_uploader(
        &self,
        id: &str,
    ) -> Result<NoteWithUploader, DatabaseError> {
        sqlx::query_as::<_, NoteWithUploader>(&format!("{SELECT_WITH_UPLOADER} WHERE n.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Note {id}")))
    }

    /// Atomically add one to a note's view counter.
    pub async fn increment_views(&self, id: &str) -> Result<Note, DatabaseError> {
        self.increment_counter(id, "UPDATE notes SET views = views + 1 WHERE id = ?")
            .await
    }

    /// Atomically add one to a note's download counter.
    pub async fn increment_downloads(&self, id: &str) -> Result<Note, DatabaseError> {
        self.increment_counter(id, "UPDATE notes SET downloads = downloads + 1 WHERE id = ?")
            .await
    }

    async fn increment_counter(&self, id: &str, sql: &'static str) -> Result<Note, DatabaseError> {
        let result = sqlx::query(sql).bind(id).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Note {id}")));
        }
        self.get_note(id).await
    }

    /// One page of notes, newest first.
    pub async fn list_notes(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NoteWithUploader>, DatabaseError> {
        let notes = sqlx::query_as::<_, NoteWithUploader>(&format!(
            "{SELECT_WITH_UPLOADER} ORDER BY n.created_at DESC, n.rowid DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(notes)
    }

    /// Count all notes.
    pub async fn count_notes(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Most recently uploaded notes across all uploaders.
    pub async fn latest_notes(&self, limit: u32) -> Result<Vec<NoteWithUploader>, DatabaseError> {
        self.list_notes(limit, 0).await
    }

    /// Most viewed notes across all uploaders.
    pub async fn popular_notes(&self, limit: u32) -> Result<Vec<NoteWithUploader>, DatabaseError> {
        let notes = sqlx::query_as::<_, NoteWithUploader>(&format!(
            "{SELECT_WITH_UPLOADER} ORDER BY n.views DESC, n.created_at DESC, n.rowid DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(notes)
    }

    /// All notes of one uploader, newest first.
    pub async fn notes_by_uploader(&self, uploader_id: &str) -> Result<Vec<Note>, DatabaseError> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE uploader_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(uploader_id)
        .fetch_all(self.pool())
        .await?;

        Ok(notes)
    }

    /// The uploader's most recent note.
    pub async fn latest_by_uploader(&self, uploader_id: &str) -> Result<Option<Note>, DatabaseError> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE uploader_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(uploader_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(note)
    }

    /// The uploader's most viewed note.
    pub async fn popular_by_uploader(
        &self,
        uploader_id: &str,
    ) -> Result<Option<Note>, DatabaseError> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE uploader_id = ? \
             ORDER BY views DESC, created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(uploader_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(note)
    }

    /// Note count plus summed counters for one uploader.
    pub async fn uploader_totals(&self, uploader_id: &str) -> Result<NoteTotals, DatabaseError> {
        let totals = sqlx::query_as::<_, NoteTotals>(
            "SELECT COUNT(*) AS count, COALESCE(SUM(views), 0) AS views, \
             COALESCE(SUM(downloads), 0) AS downloads FROM notes WHERE uploader_id = ?",
        )
        .bind(uploader_id)
        .fetch_one(self.pool())
        .await?;

        Ok(totals)
    }
}
