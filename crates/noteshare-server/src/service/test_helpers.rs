//! Shared setup for service test modules.

use std::sync::Arc;

use tempfile::TempDir;

use crate::auth::JwtManager;
use crate::blob::DiskBlobStore;
use crate::delivery::OtpDispatcher;
use crate::delivery::testing::RecordingSender;
use crate::presence::InMemoryPresence;
use crate::storage::{NewUser, NoteshareDatabase, User};

use super::notes::UploadedFile;
use super::{
    NoteService, PurchaseService, RegistrationService, SessionService, SocialService,
    UploadRequest,
};

pub const TEST_OTP_TTL: i64 = 300;

pub struct Harness {
    pub db: NoteshareDatabase,
    pub email: Arc<RecordingSender>,
    pub sms: Arc<RecordingSender>,
    pub jwt: Arc<JwtManager>,
    pub presence: Arc<InMemoryPresence>,
    pub registration: RegistrationService,
    pub session: SessionService,
    pub notes: NoteService,
    pub purchases: PurchaseService,
    pub social: SocialService,
    pub uploads: TempDir,
}

pub async fn harness() -> Harness {
    let db = NoteshareDatabase::open_in_memory().await.unwrap();
    let email = Arc::new(RecordingSender::default());
    let sms = Arc::new(RecordingSender::default());
    let jwt = Arc::new(JwtManager::new(b"test-secret", 3600));
    let presence = Arc::new(InMemoryPresence::new(3600));
    let uploads = tempfile::tempdir().unwrap();
    let blobs = Arc::new(DiskBlobStore::new(uploads.path()));

    let dispatcher = OtpDispatcher::new(email.clone(), sms.clone());
    Harness {
        registration: RegistrationService::new(db.clone(), dispatcher, TEST_OTP_TTL),
        session: SessionService::new(db.clone(), Arc::clone(&jwt), presence.clone()),
        notes: NoteService::new(db.clone(), blobs, presence.clone()),
        purchases: PurchaseService::new(db.clone()),
        social: SocialService::new(db.clone()),
        db,
        email,
        sms,
        jwt,
        presence,
        uploads,
    }
}

/// Insert a user directly, bypassing the signup flow.
pub async fn seed_user(db: &NoteshareDatabase, id: &str, username: &str) -> User {
    let email = format!("{username}@example.com");
    db.create_user(&NewUser {
        id,
        name: username,
        username,
        email: Some(&email),
        phone: None,
        password_hash: "hash",
    })
    .await
    .unwrap()
}

pub fn pdf(name: &str) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: Some("application/pdf".into()),
        bytes: format!("%PDF {name}").into_bytes(),
    }
}

pub fn upload_request(uploader_id: &str, title: &str, price: i64) -> UploadRequest {
    UploadRequest {
        title: title.to_string(),
        subject: "Maths".to_string(),
        uploader_id: uploader_id.to_string(),
        price,
        file: Some(pdf(&format!("{title}.pdf"))),
        image: None,
    }
}

/// Number of stored blobs under the uploads root.
pub fn blob_count(h: &Harness) -> usize {
    std::fs::read_dir(h.uploads.path().join("notes"))
        .map(|dir| dir.count())
        .unwrap_or(0)
}
