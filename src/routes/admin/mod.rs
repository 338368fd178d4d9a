//! Admin CMS endpoints, mounted under `/api/admin` behind
//! [`require_admin`](super::auth::require_admin).
//!
//! Every mutation answers with the `{ success, data?, error? }` envelope and
//! revalidates the pages that display the changed entity.

pub mod portfolio;
pub mod posts;
pub mod site;

use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, patch, put},
    Json, Router,
};

use crate::{content, db, error::AppError, error::AppResult};

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(dashboard))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/tags", get(posts::list_tags).post(posts::create_tag))
        .route(
            "/tags/{id}",
            patch(posts::update_tag).delete(posts::delete_tag),
        )
        .route("/projects", get(portfolio::list_projects).post(portfolio::create_project))
        .route(
            "/projects/{id}",
            patch(portfolio::update_project).delete(portfolio::delete_project),
        )
        .route("/skills", get(portfolio::list_skills).post(portfolio::create_skill))
        .route(
            "/skills/{id}",
            patch(portfolio::update_skill).delete(portfolio::delete_skill),
        )
        .route(
            "/timeline",
            get(portfolio::list_timeline).post(portfolio::create_timeline_event),
        )
        .route(
            "/timeline/{id}",
            patch(portfolio::update_timeline_event).delete(portfolio::delete_timeline_event),
        )
        .route("/settings", get(site::list_settings))
        .route("/settings/{key}", put(site::set_setting))
        .route("/guestbook", get(site::list_guestbook))
        .route("/guestbook/{id}", delete(site::delete_guestbook_entry))
}

/// Reject blank required text fields.
pub(crate) fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Same as [`require_text`] for a field that is only checked when present.
pub(crate) fn require_text_if_set(value: Option<&str>, field: &str) -> AppResult<()> {
    value.map_or(Ok(()), |v| require_text(v, field))
}

/// Admin listings read through without caching; no database means no rows.
pub(crate) async fn admin_read<T, F, Fut>(load: F) -> Response
where
    T: serde::Serialize + Default,
    F: FnOnce(std::sync::Arc<sqlx::PgPool>) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    match db::get_pool() {
        Some(pool) => Json(load(pool).await).into_response(),
        None => Json(T::default()).into_response(),
    }
}

/// GET /api/admin/stats
pub async fn dashboard() -> Response {
    admin_read(|pool| async move { content::dashboard(&pool).await }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::{create_token, require_admin, Claims, ROLE_ADMIN};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware;
    use tower::ServiceExt;

    fn admin_app() -> Router {
        Router::new().nest(
            "/api/admin",
            router().route_layer(middleware::from_fn(require_admin)),
        )
    }

    fn admin_token() -> String {
        create_token(&Claims::new("admin", "admin@example.com", ROLE_ADMIN)).unwrap()
    }

    async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = admin_app().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections answer in plain text.
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", admin_token()));
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("Hello", "Title").is_ok());
        let err = require_text("   ", "Title").unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert!(require_text_if_set(None, "Title").is_ok());
        assert!(require_text_if_set(Some(""), "Title").is_err());
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let req = Request::get("/api/admin/posts").body(Body::empty()).unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_dashboard_without_database_is_zeroed() {
        let (status, body) = send(authed("GET", "/api/admin/stats", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["posts"], 0);
        assert_eq!(body["topPosts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_create_post_validates_before_database() {
        let (status, body) = send(authed(
            "POST",
            "/api/admin/posts",
            Some(serde_json::json!({ "title": " ", "slug": "x", "content": "" })),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title is required");
    }

    #[tokio::test]
    async fn test_mutation_without_database_is_unavailable() {
        let (status, body) = send(authed(
            "POST",
            "/api/admin/tags",
            Some(serde_json::json!({ "name": "Rust", "slug": "rust" })),
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Database not available");
    }

    #[tokio::test]
    async fn test_setting_requires_value() {
        let (status, _) = send(authed(
            "PUT",
            "/api/admin/settings/site_title",
            Some(serde_json::json!({ "description": "no value" })),
        ))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
