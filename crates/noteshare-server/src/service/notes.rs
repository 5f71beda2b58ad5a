//! Uploads, counters and the catalogue.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use noteshare_core::AdmissionDecision;
use noteshare_core::admission;

use super::ServiceError;
use crate::blob::{BlobStore, is_blocked_content_type};
use crate::presence::PresenceTracker;
use crate::storage::{NewNote, Note, NoteTotals, NoteWithUploader, NoteshareDatabase};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const HOME_FEED_SIZE: u32 = 5;

/// A file part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    fn is_blocked(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(is_blocked_content_type)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub title: String,
    pub subject: String,
    pub uploader_id: String,
    pub price: i64,
    pub file: Option<UploadedFile>,
    pub image: Option<UploadedFile>,
}

/// File contents served by a download.
#[derive(Debug, Clone)]
pub struct Download {
    pub note: Note,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<NoteWithUploader>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_notes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeFeed {
    pub latest: Vec<NoteWithUploader>,
    pub popular: Vec<NoteWithUploader>,
    pub logged_in_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserHome {
    pub latest: Option<Note>,
    pub popular: Option<Note>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotes {
    pub notes: Vec<Note>,
    pub total_views: i64,
    pub total_downloads: i64,
}

/// Normalised `(page, limit, offset)` for a listing request.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(limit);
    (page, limit, offset)
}

/// `ceil(total / limit)` for positive `limit`.
pub const fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

#[derive(Clone)]
pub struct NoteService {
    db: NoteshareDatabase,
    blobs: Arc<dyn BlobStore>,
    presence: Arc<dyn PresenceTracker>,
}

impl NoteService {
    pub fn new(
        db: NoteshareDatabase,
        blobs: Arc<dyn BlobStore>,
        presence: Arc<dyn PresenceTracker>,
    ) -> Self {
        Self {
            db,
            blobs,
            presence,
        }
    }

    /// Store an uploaded note, subject to price validation and the
    /// free-upload quota.
    #[instrument(
        skip(self, req),
        fields(op = "upload", uploader_id = %req.uploader_id, price = req.price)
    )]
    pub async fn upload(&self, req: UploadRequest) -> Result<Note, ServiceError> {
        let Some(file) = req.file.as_ref() else {
            return Err(ServiceError::invalid_input("At least one file is required"));
        };
        let title = req.title.trim();
        if title.is_empty() {
            return Err(ServiceError::invalid_input("Title is required"));
        }
        if !admission::is_valid_price(req.price) {
            return Err(ServiceError::InvalidPrice);
        }

        self.db.get_user(&req.uploader_id).await?;

        if file.is_blocked() || req.image.as_ref().is_some_and(UploadedFile::is_blocked) {
            return Err(ServiceError::BlockedFileType);
        }

        let tally = self.db.uploader_tally(&req.uploader_id).await?;
        match admission::admit(tally, req.price) {
            AdmissionDecision::Admit => {}
            AdmissionDecision::InvalidPrice => return Err(ServiceError::InvalidPrice),
            AdmissionDecision::QuotaExceeded => {
                warn!(total = tally.total, free = tally.free, "Free upload refused");
                return Err(ServiceError::QuotaExceeded);
            }
        }

        let mut stored = Vec::with_capacity(2);
        let file_path = self.store_blob(file, &mut stored).await?;
        let image_path = match req.image.as_ref() {
            Some(image) => self.store_blob(image, &mut stored).await?,
            None => String::new(),
        };

        let id = uuid::Uuid::new_v4().to_string();
        let inserted = self
            .db
            .insert_note_admitted(&NewNote {
                id: &id,
                title,
                subject: req.subject.trim(),
                uploader_id: &req.uploader_id,
                image_path: &image_path,
                file_path: &file_path,
                price: req.price,
            })
            .await;

        match inserted {
            Ok(Some(note)) => {
                info!(note_id = %note.id, "Note uploaded");
                Ok(note)
            }
            Ok(None) => {
                // Another free upload won the race since the tally was read.
                warn!("Free upload refused at insert");
                self.discard(&stored).await;
                Err(ServiceError::QuotaExceeded)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e.into())
            }
        }
    }

    async fn store_blob(
        &self,
        file: &UploadedFile,
        stored: &mut Vec<String>,
    ) -> Result<String, ServiceError> {
        match self
            .blobs
            .store(&file.file_name, file.content_type.as_deref(), &file.bytes)
            .await
        {
            Ok(key) => {
                stored.push(key.clone());
                Ok(key)
            }
            Err(e) => {
                self.discard(stored).await;
                Err(e.into())
            }
        }
    }

    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.blobs.remove(key).await {
                warn!(key = %key, error = %e, "Failed to remove orphaned blob");
            }
        }
    }

    /// Count a view unless the requester is anonymous or the uploader.
    #[instrument(skip(self), fields(op = "record_view"))]
    pub async fn record_view(
        &self,
        note_id: &str,
        requester: Option<&str>,
    ) -> Result<Note, ServiceError> {
        let note = self.db.get_note(note_id).await?;
        if counts_for(&note, requester) {
            return Ok(self.db.increment_views(note_id).await?);
        }
        Ok(note)
    }

    /// Resolve a note's file and count the download for non-owners.
    #[instrument(skip(self), fields(op = "record_download"))]
    pub async fn record_download(
        &self,
        note_id: &str,
        requester: Option<&str>,
    ) -> Result<Download, ServiceError> {
        let mut note = self.db.get_note(note_id).await?;
        if !self.blobs.exists(&note.file_path).await {
            warn!(note_id, "Note file missing from storage");
            return Err(ServiceError::FileMissing);
        }
        let bytes = self.blobs.read(&note.file_path).await?;

        if counts_for(&note, requester) {
            note = self.db.increment_downloads(note_id).await?;
        }

        let file_name = note
            .file_path
            .rsplit('/')
            .next()
            .unwrap_or(&note.file_path)
            .to_string();
        Ok(Download {
            note,
            file_name,
            bytes,
        })
    }

    /// One page of the catalogue, newest first.
    pub async fn list_notes(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<NotePage, ServiceError> {
        let (page, limit, offset) = page_window(page, limit);
        let notes = self
            .db
            .list_notes(
                u32::try_from(limit).unwrap_or(u32::MAX),
                u32::try_from(offset).unwrap_or(u32::MAX),
            )
            .await?;
        let total = self.db.count_notes().await?;

        Ok(NotePage {
            notes,
            current_page: page,
            total_pages: total_pages(total, limit),
            total_notes: total,
        })
    }

    pub async fn home_feed(&self) -> Result<HomeFeed, ServiceError> {
        Ok(HomeFeed {
            latest: self.db.latest_notes(HOME_FEED_SIZE).await?,
            popular: self.db.popular_notes(HOME_FEED_SIZE).await?,
            logged_in_users: self.presence.snapshot().await,
        })
    }

    pub async fn user_home(&self, user_id: &str) -> Result<UserHome, ServiceError> {
        Ok(UserHome {
            latest: self.db.latest_by_uploader(user_id).await?,
            popular: self.db.popular_by_uploader(user_id).await?,
        })
    }

    pub async fn user_stats(&self, user_id: &str) -> Result<NoteTotals, ServiceError> {
        Ok(self.db.uploader_totals(user_id).await?)
    }

    pub async fn user_notes(&self, user_id: &str) -> Result<UserNotes, ServiceError> {
        let notes = self.db.notes_by_uploader(user_id).await?;
        let total_views = notes.iter().map(|n| n.views).sum();
        let total_downloads = notes.iter().map(|n| n.downloads).sum();
        Ok(UserNotes {
            notes,
            total_views,
            total_downloads,
        })
    }

    /// A note with its uploader; a non-owner requester counts as a view.
    #[instrument(skip(self), fields(op = "note_detail"))]
    pub async fn note_detail(
        &self,
        note_id: &str,
        requester: Option<&str>,
    ) -> Result<NoteWithUploader, ServiceError> {
        let mut detail = self.db.get_note_with_uploader(note_id).await?;
        if counts_for(&detail.note, requester) {
            detail.note = self.db.increment_views(note_id).await?;
        }
        Ok(detail)
    }
}

/// Whether a request by `requester` should move a note's counters.
fn counts_for(note: &Note, requester: Option<&str>) -> bool {
    requester.is_some_and(|id| !note.is_owned_by(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_defaults_and_clamps() {
        assert_eq!(page_window(None, None), (1, 10, 0));
        assert_eq!(page_window(Some(3), Some(20)), (3, 20, 40));
        assert_eq!(page_window(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(page_window(Some(-4), Some(500)), (1, 100, 0));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
