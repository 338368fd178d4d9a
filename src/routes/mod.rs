//! HTTP handlers.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod chat;
pub mod guestbook;
pub mod health;
pub mod newsletter;
pub mod portfolio;
pub mod seo;

use axum::{
    body::Bytes,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;

use crate::{cache, db, error::AppError, error::AppResult};

/// The process-wide pool, or 503 when the service runs without a database.
pub(crate) fn pool() -> AppResult<Arc<PgPool>> {
    db::get_pool().ok_or(AppError::Unavailable)
}

fn json_bytes(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Serialise `value` and return it, caching it under the page key unless the
/// page was revalidated after generation `seen`.
pub(crate) fn store_json<T: Serialize>(key: String, value: &T, seen: u64) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let body = Bytes::from(body);
            cache::put_if_current(key, body.clone(), seen);
            json_bytes(body)
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to encode response");
            AppError::Upstream("Failed to encode response".to_string()).into_response()
        }
    }
}

pub(crate) fn cached(key: &str) -> Option<Response> {
    cache::get(key).map(json_bytes)
}

/// Serve a public read from the page cache, loading it on a miss.
///
/// Without a database the default value is served and nothing is cached.
pub(crate) async fn cached_read<T, F, Fut>(key: String, load: F) -> Response
where
    T: Serialize + Default,
    F: FnOnce(Arc<PgPool>) -> Fut,
    Fut: Future<Output = T>,
{
    if let Some(hit) = cached(&key) {
        return hit;
    }
    let Some(pool) = db::get_pool() else {
        tracing::warn!(key = %key, "database not available, serving empty content");
        return Json(T::default()).into_response();
    };
    read_through(key, pool, load).await
}

/// Load on a cache miss. The generation is taken before loading so a
/// mutation that revalidates mid-load keeps its result out of the cache.
async fn read_through<T, F, Fut>(key: String, pool: Arc<PgPool>, load: F) -> Response
where
    T: Serialize,
    F: FnOnce(Arc<PgPool>) -> Fut,
    Fut: Future<Output = T>,
{
    let seen = cache::generation();
    let value = load(pool).await;
    store_json(key, &value, seen)
}
