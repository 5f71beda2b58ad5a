//! Upload, counter and catalogue routes.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::AppState;
use super::extract::Requester;
use super::multipart::read_upload;
use crate::service::ServiceError;
use crate::service::notes::{HomeFeed, NotePage, UserHome, UserNotes};
use crate::storage::{Note, NoteTotals, NoteWithUploader};

/// `POST /api/user/upload`
pub async fn upload(
    State(state): State<AppState>,
    form: Multipart,
) -> Result<Json<Note>, ServiceError> {
    let req = read_upload(form).await?;
    Ok(Json(state.notes.upload(req).await?))
}

/// `POST /api/user/view/{id}`
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    requester: Requester,
) -> Result<Json<Note>, ServiceError> {
    Ok(Json(state.notes.record_view(&id, requester.id()).await?))
}

/// `GET /api/user/download/{id}`
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    requester: Requester,
) -> Result<Response, ServiceError> {
    let download = state.notes.record_download(&id, requester.id()).await?;
    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

/// `GET /api/user/`
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeFeed>, ServiceError> {
    Ok(Json(state.notes.home_feed().await?))
}

/// `GET /api/user/home/{user_id}`
pub async fn user_home(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserHome>, ServiceError> {
    Ok(Json(state.notes.user_home(&user_id).await?))
}

/// Raw pagination parameters. Unparseable values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// `GET /api/user/notes`
pub async fn list_notes(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<NotePage>, ServiceError> {
    let page = state
        .notes
        .list_notes(lenient_int(q.page.as_deref()), lenient_int(q.limit.as_deref()))
        .await?;
    Ok(Json(page))
}

/// `GET /api/user/notes/{id}`
pub async fn note_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    requester: Requester,
) -> Result<Json<NoteWithUploader>, ServiceError> {
    Ok(Json(state.notes.note_detail(&id, requester.id()).await?))
}

/// `GET /api/user/notes/stats/{user_id}`
pub async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<NoteTotals>, ServiceError> {
    Ok(Json(state.notes.user_stats(&user_id).await?))
}

/// `GET /api/user/notes/user/{user_id}`
pub async fn user_notes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserNotes>, ServiceError> {
    Ok(Json(state.notes.user_notes(&user_id).await?))
}
