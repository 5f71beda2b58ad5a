//! HTTP surface.
//!
//! All application routes live under `/api/user`; uploaded files are served
//! read-only under `/uploads`, and `/health` answers liveness checks.

pub mod error;
pub mod extract;
pub mod multipart;
pub mod routes_market;
pub mod routes_notes;
pub mod routes_users;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::blob::BlobStore;
use crate::delivery::OtpDispatcher;
use crate::presence::PresenceTracker;
use crate::service::{
    NoteService, PurchaseService, RegistrationService, SessionService, SocialService,
};
use crate::storage::NoteshareDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registration: RegistrationService,
    pub session: SessionService,
    pub notes: NoteService,
    pub purchases: PurchaseService,
    pub social: SocialService,
    pub jwt: Arc<JwtManager>,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Collaborators the services are wired from.
pub struct Components {
    pub db: NoteshareDatabase,
    pub jwt: Arc<JwtManager>,
    pub dispatcher: OtpDispatcher,
    pub blobs: Arc<dyn BlobStore>,
    pub presence: Arc<dyn PresenceTracker>,
    pub otp_ttl_secs: i64,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(c: Components) -> Self {
        Self {
            registration: RegistrationService::new(c.db.clone(), c.dispatcher, c.otp_ttl_secs),
            session: SessionService::new(
                c.db.clone(),
                Arc::clone(&c.jwt),
                Arc::clone(&c.presence),
            ),
            notes: NoteService::new(c.db.clone(), c.blobs, c.presence),
            purchases: PurchaseService::new(c.db.clone()),
            social: SocialService::new(c.db),
            jwt: c.jwt,
            uploads_dir: c.uploads_dir,
            max_upload_bytes: c.max_upload_bytes,
        }
    }
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(routes_users::register))
        .route("/send-otp", post(routes_users::send_otp))
        .route("/verify-otp", post(routes_users::verify_otp))
        .route("/set-username", post(routes_users::set_username))
        .route("/login", post(routes_users::login))
        .route("/upload", post(routes_notes::upload))
        .route("/view/{id}", post(routes_notes::view))
        .route("/download/{id}", get(routes_notes::download))
        .route("/", get(routes_notes::home))
        .route("/home/{user_id}", get(routes_notes::user_home))
        .route("/notes", get(routes_notes::list_notes))
        .route("/notes/{id}", get(routes_notes::note_detail))
        .route("/notes/stats/{user_id}", get(routes_notes::user_stats))
        .route("/notes/user/{user_id}", get(routes_notes::user_notes))
        .route("/notes/{id}/buy", post(routes_market::buy))
        .route("/purchases", get(routes_market::purchases))
        .route("/wallet/credit", post(routes_market::credit))
        .route(
            "/follow/{user_id}",
            post(routes_market::follow).delete(routes_market::unfollow),
        );

    Router::new()
        .route("/health", get(health))
        .route("/api/user/", get(routes_notes::home))
        .nest("/api/user", api)
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
