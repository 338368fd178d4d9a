/**
 * Portfolio Routes
 * Projects, skills, timeline and public site settings
 */
use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{blog::LimitQuery, cached_read};
use crate::{content, db, error::AppError};

#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    /// Comma-separated keys, e.g. `site_title,site_description`
    #[serde(default)]
    pub keys: String,
}

fn parse_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// GET /api/projects
pub async fn list_projects() -> Response {
    cached_read("/projects".to_string(), |pool| async move {
        content::projects(&pool).await
    })
    .await
}

/// GET /api/projects/featured?limit=4
pub async fn featured_projects(Query(query): Query<LimitQuery>) -> Response {
    let limit = query.limit.unwrap_or(content::DEFAULT_FEATURED_PROJECTS);
    cached_read(format!("/projects?featured={limit}"), |pool| async move {
        content::featured_projects(&pool, limit).await
    })
    .await
}

/// GET /api/skills
/// Skills grouped by category.
pub async fn list_skills() -> Response {
    cached_read("/about?section=skills".to_string(), |pool| async move {
        content::group_by_category(content::skills(&pool).await)
    })
    .await
}

/// GET /api/timeline
pub async fn list_timeline() -> Response {
    cached_read("/about?section=timeline".to_string(), |pool| async move {
        content::timeline(&pool).await
    })
    .await
}

/// GET /api/config?keys=a,b
pub async fn config_values(Query(query): Query<ConfigQuery>) -> Response {
    let keys = parse_keys(&query.keys);
    cached_read(format!("/?config={}", keys.join(",")), |pool| async move {
        content::config_values(&pool, &keys).await
    })
    .await
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

/// GET /api/config/{key}
pub async fn config_value(Path(key): Path<String>) -> Response {
    let value = match db::get_pool() {
        Some(pool) => content::config_value(&pool, &key).await,
        None => None,
    };
    match value {
        Some(value) => Json(ConfigEntry { key, value }).into_response(),
        None => AppError::NotFound(format!("No setting named {key}")).into_response(),
    }
}
