use axum::{http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};

use super::pool;
use crate::{
    error::{ActionResponse, AppError, AppResult},
    newsletter::{
        self,
        mailer::{Mailer, ResendMailer},
        NewsletterError,
    },
};

#[derive(Debug, Deserialize, Serialize)]
pub struct EmailForm {
    #[serde(default)]
    pub email: String,
}

impl From<NewsletterError> for AppError {
    fn from(err: NewsletterError) -> Self {
        match err {
            NewsletterError::InvalidEmail => AppError::BadRequest(err.to_string()),
            NewsletterError::AlreadySubscribed => AppError::Conflict(err.to_string()),
            NewsletterError::Database { message, source } => AppError::Database {
                message: message.to_string(),
                source,
            },
        }
    }
}

/// POST /api/newsletter/subscribe (form-encoded `email`)
pub async fn subscribe(
    Form(form): Form<EmailForm>,
) -> AppResult<(StatusCode, Json<ActionResponse<()>>)> {
    if !newsletter::is_valid_email(form.email.trim()) {
        return Err(NewsletterError::InvalidEmail.into());
    }

    let pool = pool()?;
    let mailer = ResendMailer::from_config();
    newsletter::subscribe(&pool, mailer.as_ref().map(|m| m as &dyn Mailer), &form.email).await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::done())))
}

/// POST /api/newsletter/unsubscribe (form-encoded `email`)
pub async fn unsubscribe(Form(form): Form<EmailForm>) -> AppResult<Json<ActionResponse<()>>> {
    let pool = pool()?;
    newsletter::unsubscribe(&pool, &form.email).await?;
    Ok(Json(ActionResponse::done()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    async fn post_form(uri: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route("/api/newsletter/subscribe", post(subscribe))
            .route("/api/newsletter/unsubscribe", post(unsubscribe));
        let req = Request::post(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_email_is_bad_request() {
        let (status, body) = post_form("/api/newsletter/subscribe", "email=not-an-email").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Please enter a valid email address");
    }

    #[tokio::test]
    async fn test_valid_email_without_database_is_unavailable() {
        let (status, _) =
            post_form("/api/newsletter/subscribe", "email=reader%40example.com").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err: AppError = NewsletterError::AlreadySubscribed.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "This email is already subscribed");
    }
}
