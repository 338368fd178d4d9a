/**
 * Blog Routes
 * Public post reads plus view/like counters
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, Query},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;

use super::{cached, cached_read, pool, store_json};
use crate::{
    cache, content, db,
    engagement::{self, LikeOutcome},
    error::{ActionResponse, AppError, AppResult},
};

// ============================================================================
// Session identity
// ============================================================================

/// Anonymous visitor session derived from client IP and user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession(pub String);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for ClientSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let ip = header_str(&parts.headers, "x-forwarded-for")
            .or_else(|| header_str(&parts.headers, "x-real-ip"))
            .map(str::to_string)
            .or(peer)
            .unwrap_or_else(|| "unknown".to_string());
        let user_agent = header_str(&parts.headers, "user-agent").unwrap_or("unknown");

        Ok(ClientSession(engagement::session_hash(&ip, user_agent)))
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i32>,
    pub session_likes: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLikes {
    pub session_likes: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/posts
pub async fn list_posts() -> Response {
    cached_read("/blog".to_string(), |pool| async move {
        content::published_posts(&pool).await
    })
    .await
}

/// GET /api/posts/latest?limit=3
pub async fn latest_posts(Query(query): Query<LimitQuery>) -> Response {
    let limit = query.limit.unwrap_or(content::DEFAULT_LATEST_POSTS);
    cached_read(format!("/?latest={limit}"), |pool| async move {
        content::latest_posts(&pool, limit).await
    })
    .await
}

/// GET /api/posts/{slug}
pub async fn get_post(Path(slug): Path<String>) -> Response {
    let key = format!("/blog/{slug}");
    if let Some(hit) = cached(&key) {
        return hit;
    }
    let Some(pool) = db::get_pool() else {
        return AppError::NotFound("Post not found".to_string()).into_response();
    };
    let seen = cache::generation();
    match content::post_by_slug(&pool, &slug).await {
        Some(post) => store_json(key, &post, seen),
        None => AppError::NotFound("Post not found".to_string()).into_response(),
    }
}

/// POST /api/posts/{slug}/view
///
/// Answers immediately; the increment runs in the background.
pub async fn record_view(Path(slug): Path<String>) -> StatusCode {
    match db::get_pool() {
        Some(pool) => {
            engagement::spawn_view_increment(pool, slug);
        }
        None => tracing::debug!(slug = %slug, "view not counted, database not available"),
    }
    StatusCode::ACCEPTED
}

/// POST /api/posts/{slug}/like
pub async fn like_post(session: ClientSession, Path(slug): Path<String>) -> AppResult<Response> {
    let pool = pool()?;
    let store = engagement::like_store();

    let outcome = engagement::like_post(store.as_ref(), &pool, &session.0, &slug)
        .await
        .map_err(|e| AppError::persistence("Failed to increment like count", e))?;

    Ok(match outcome {
        LikeOutcome::Liked {
            like_count,
            session_likes,
        } => {
            cache::revalidate(&format!("/blog/{slug}"));
            Json(ActionResponse::ok(LikeResult {
                like_count: Some(like_count),
                session_likes,
            }))
            .into_response()
        }
        LikeOutcome::LimitReached { session_likes } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ActionResponse {
                success: false,
                data: Some(LikeResult {
                    like_count: None,
                    session_likes,
                }),
                error: Some("Like limit reached".to_string()),
            }),
        )
            .into_response(),
        LikeOutcome::PostNotFound => {
            AppError::NotFound("Post not found".to_string()).into_response()
        }
    })
}

/// GET /api/posts/{slug}/stats
pub async fn post_stats(Path(slug): Path<String>) -> Response {
    match db::get_pool() {
        Some(pool) => Json(engagement::post_stats(&pool, &slug).await).into_response(),
        None => Json(db::models::PostStats::default()).into_response(),
    }
}

/// GET /api/posts/{slug}/session-likes
pub async fn session_likes(session: ClientSession, Path(slug): Path<String>) -> Json<SessionLikes> {
    let store = engagement::like_store();
    Json(SessionLikes {
        session_likes: engagement::session_likes(store.as_ref(), &session.0, &slug).await,
    })
}
