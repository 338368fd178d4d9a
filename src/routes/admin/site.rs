//! Site settings and guestbook moderation.

use axum::{extract::Path, response::Response, Json};
use serde::Deserialize;

use super::{admin_read, require_text};
use crate::{
    cache, content, db,
    db::models::SiteConfig,
    error::{ActionResponse, AppError, AppResult},
    routes::{guestbook::GUESTBOOK_PATHS, pool},
};

const SETTINGS_PATHS: &[&str] = &["/admin/settings", "/"];

#[derive(Debug, Deserialize)]
pub struct SetConfigRequest {
    pub value: String,
    pub description: Option<String>,
}

/// GET /api/admin/settings
pub async fn list_settings() -> Response {
    admin_read(|pool| async move { content::all_config(&pool).await }).await
}

/// PUT /api/admin/settings/{key}
/// Insert or update in one statement.
pub async fn set_setting(
    Path(key): Path<String>,
    Json(request): Json<SetConfigRequest>,
) -> AppResult<Json<ActionResponse<SiteConfig>>> {
    require_text(&key, "Key")?;

    let pool = pool()?;
    let entry = db::config::set(&pool, &key, &request.value, request.description.as_deref())
        .await
        .map_err(|e| AppError::persistence("Failed to save setting", e))?;

    tracing::info!(key = %key, "setting saved");
    cache::revalidate_all(SETTINGS_PATHS);
    Ok(Json(ActionResponse::ok(entry)))
}

/// GET /api/admin/guestbook
pub async fn list_guestbook() -> Response {
    admin_read(|pool| async move { content::all_guestbook_entries(&pool).await }).await
}

/// DELETE /api/admin/guestbook/{id}
pub async fn delete_guestbook_entry(Path(id): Path<i32>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    let deleted = db::guestbook::delete(&pool, id)
        .await
        .map_err(|e| AppError::persistence("Failed to delete message", e))?;
    if !deleted {
        return Err(AppError::NotFound("Message not found".to_string()));
    }

    tracing::info!(entry_id = id, "guestbook entry removed");
    cache::revalidate_all(GUESTBOOK_PATHS);
    Ok(Json(ActionResponse::done()))
}
