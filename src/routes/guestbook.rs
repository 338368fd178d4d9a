use axum::{http::HeaderMap, http::StatusCode, response::Response, Json};
use serde::{Deserialize, Serialize};

use super::{auth::visitor_claims, cached_read, pool};
use crate::{
    cache, content,
    db::models::GuestbookEntry,
    error::{ActionResponse, AppError, AppResult},
    guestbook::{self, GuestbookError},
};

pub(crate) const GUESTBOOK_PATHS: &[&str] = &["/guestbook", "/admin/guestbook"];

#[derive(Debug, Deserialize, Serialize)]
pub struct GuestbookRequest {
    #[serde(default)]
    pub message: String,
}

impl From<GuestbookError> for AppError {
    fn from(err: GuestbookError) -> Self {
        match err {
            GuestbookError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            GuestbookError::Empty | GuestbookError::TooLong | GuestbookError::Inappropriate => {
                AppError::BadRequest(err.to_string())
            }
            GuestbookError::Database(source) => AppError::Database {
                message: "Failed to save message, please try again later".to_string(),
                source,
            },
        }
    }
}

/// GET /api/guestbook
pub async fn list_entries() -> Response {
    cached_read("/guestbook".to_string(), |pool| async move {
        content::guestbook_entries(&pool).await
    })
    .await
}

/// POST /api/guestbook
pub async fn create_entry(
    headers: HeaderMap,
    Json(payload): Json<GuestbookRequest>,
) -> AppResult<(StatusCode, Json<ActionResponse<GuestbookEntry>>)> {
    let author = visitor_claims(&headers).map(|claims| claims.author());
    if author.is_none() {
        return Err(GuestbookError::Unauthenticated.into());
    }
    guestbook::validate_message(&payload.message)?;

    let pool = pool()?;
    let entry = guestbook::submit(&pool, author, &payload.message).await?;
    cache::revalidate_all(GUESTBOOK_PATHS);

    Ok((StatusCode::CREATED, Json(ActionResponse::ok(entry))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::{create_token, Claims, ROLE_VISITOR};
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn guestbook_router() -> Router {
        Router::new().route("/api/guestbook", get(list_entries).post(create_entry))
    }

    async fn post_message(token: Option<&str>, message: &str) -> (StatusCode, serde_json::Value) {
        let mut req = Request::post("/api/guestbook").header("content-type", "application/json");
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let body = serde_json::to_vec(&GuestbookRequest {
            message: message.to_string(),
        })
        .unwrap();
        let res = guestbook_router()
            .oneshot(req.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn visitor_token() -> String {
        create_token(&Claims::new("u1", "reader@example.com", ROLE_VISITOR)).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_post_is_rejected() {
        let (status, body) = post_message(None, "hello").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Please sign in first");
    }

    #[tokio::test]
    async fn test_long_message_is_rejected() {
        let (status, body) = post_message(Some(&visitor_token()), &"a".repeat(101)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_banned_word_is_rejected() {
        let (status, _) = post_message(Some(&visitor_token()), "Buy SPAM now").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_valid_message_without_database_is_unavailable() {
        let (status, _) = post_message(Some(&visitor_token()), "Lovely site!").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
