/**
 * Authentication Routes
 * Admin login, token verification and the admin guard for /api/admin
 */
use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;

use crate::error::{ActionResponse, AppError, AppResult};
use crate::guestbook::GuestbookAuthor;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

lazy_static::lazy_static! {
    /// Shared with the visitor sign-in provider.
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

    pub static ref ADMIN_EMAIL: String = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@example.com".to_string());

    /// bcrypt hash of the admin password.
    pub static ref ADMIN_PASSWORD_HASH: String = {
        if let Ok(hash) = std::env::var("ADMIN_HASH_PASSWORD") {
            hash
        } else if let Ok(plain) = std::env::var("ADMIN_PASSWORD") {
            hash(&plain, DEFAULT_COST).unwrap_or_default()
        } else {
            hash("admin123", DEFAULT_COST).unwrap_or_default()
        }
    };

    /// IP -> timestamp of the last login attempt
    static ref RATE_LIMIT: Arc<RwLock<HashMap<String, i64>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// One login attempt per IP in this window.
const RATE_LIMIT_WINDOW_SECS: i64 = 5;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_VISITOR: &str = "visitor";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: &str, email: &str, role: &str) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.to_string(),
            email: email.to_string(),
            name: None,
            picture: None,
            role: role.to_string(),
            exp: (now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Guestbook identity carried by the token.
    pub fn author(&self) -> GuestbookAuthor {
        GuestbookAuthor {
            name: self.name.clone(),
            email: Some(self.email.clone()),
            image: self.picture.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            email: claims.email.clone(),
            role: claims.role.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserInfo,
    pub access_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Tokens
// ============================================================================

pub fn create_token(claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Claims of any valid token on the request, admin or visitor.
pub fn visitor_claims(headers: &HeaderMap) -> Option<Claims> {
    let token = extract_bearer_token(headers)?;
    match verify_access_token(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!("Token verification failed: {}", e);
            None
        }
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Record an attempt from `ip` at `now`; false when it falls inside the window.
/// Expired entries are dropped on every call so the map only holds active IPs.
fn allow_attempt(limits: &mut HashMap<String, i64>, ip: &str, now: i64) -> bool {
    limits.retain(|_, last| now - *last < RATE_LIMIT_WINDOW_SECS);
    if limits.contains_key(ip) {
        return false;
    }
    limits.insert(ip.to_string(), now);
    true
}

async fn check_rate_limit(ip: &str) -> bool {
    #[cfg(test)]
    {
        let _ = ip;
        return true; // Bypass in tests so validation and credentials are exercised
    }

    #[cfg(not(test))]
    {
        let mut limits = RATE_LIMIT.write().await;
        allow_attempt(&mut limits, ip, Utc::now().timestamp())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ActionResponse<LoginData>>> {
    let ip = addr.ip().to_string();

    if !check_rate_limit(&ip).await {
        return Err(AppError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
        ));
    }

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email format".to_string()));
    }

    let email_matches = payload.email.to_lowercase() == ADMIN_EMAIL.to_lowercase();
    // bcrypt is CPU-bound; keep it off the async executor.
    let password = payload.password;
    let password_matches = tokio::task::spawn_blocking(move || {
        verify(&password, &ADMIN_PASSWORD_HASH).unwrap_or(false)
    })
    .await
    .unwrap_or(false);

    if !email_matches || !password_matches {
        tracing::warn!(ip = %ip, "Failed login attempt for: {}", payload.email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let claims = Claims::new("admin", &ADMIN_EMAIL, ROLE_ADMIN);
    let access_token = create_token(&claims).map_err(|e| {
        tracing::error!("Failed to create access token: {}", e);
        AppError::Upstream("Failed to create token".to_string())
    })?;

    tracing::info!("Successful login for user: {}", claims.email);
    Ok(Json(ActionResponse::ok(LoginData {
        user: UserInfo::from(&claims),
        access_token,
    })))
}

/// POST /api/auth/verify
pub async fn verify_token(headers: HeaderMap) -> Json<VerifyResponse> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
            error: Some("No authorization token provided".to_string()),
        });
    };

    match verify_access_token(token) {
        Ok(claims) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(UserInfo::from(&claims)),
            error: None,
        }),
        Err(e) => {
            tracing::debug!("Token verification failed: {}", e);
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Invalid or expired token".to_string()),
            })
        }
    }
}

/// Guard for `/api/admin/*`: 401 without a valid token, 403 for non-admins.
/// The verified claims are left in the request extensions.
pub async fn require_admin(mut request: Request, next: Next) -> Response {
    let claims = match extract_bearer_token(request.headers()).map(verify_access_token) {
        None => {
            return AppError::Unauthorized("Authentication required".to_string()).into_response()
        }
        Some(Err(e)) => {
            tracing::debug!("Token verification failed: {}", e);
            return AppError::Unauthorized("Invalid or expired token".to_string()).into_response();
        }
        Some(Ok(claims)) => claims,
    };

    if !claims.is_admin() {
        tracing::warn!(sub = %claims.sub, "non-admin token on admin route");
        return AppError::Forbidden("Admin access required".to_string()).into_response();
    }

    request.extensions_mut().insert(claims);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn auth_router() -> Router {
        use axum::extract::connect_info::MockConnectInfo;
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/verify", post(verify_token))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
    }

    fn guarded_router() -> Router {
        Router::new()
            .route("/secret", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(require_admin))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn get_with_token(app: Router, uri: &str, token: Option<&str>) -> StatusCode {
        let mut req = Request::get(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        app.oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn test_token_round_trip_keeps_visitor_profile() {
        let mut claims = Claims::new("github|42", "reader@example.com", ROLE_VISITOR);
        claims.name = Some("Reader".to_string());
        let token = create_token(&claims).unwrap();
        let decoded = verify_access_token(&token).unwrap();
        assert_eq!(decoded, claims);
        assert!(!decoded.is_admin());
        assert_eq!(decoded.author().name.as_deref(), Some("Reader"));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut claims = Claims::new("admin", "admin@example.com", ROLE_ADMIN);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = create_token(&claims).unwrap();
        assert!(verify_access_token(&token).is_err());
    }

    #[test]
    fn test_rate_limit_window() {
        let mut limits = HashMap::new();
        assert!(allow_attempt(&mut limits, "1.2.3.4", 100));
        assert!(!allow_attempt(&mut limits, "1.2.3.4", 103));
        assert!(allow_attempt(&mut limits, "5.6.7.8", 103));
        assert!(allow_attempt(&mut limits, "1.2.3.4", 105));
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_invalid_email_format_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "no-at-sign".to_string(),
                password: "admin123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_returns_unauthorized() {
        let (status, bytes) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "wrongpassword".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_verify_no_token_returns_error_in_body() {
        let req = Request::post("/api/auth/verify").body(Body::empty()).unwrap();
        let res = auth_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: VerifyResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.success);
        assert!(!body.is_valid);
    }

    #[tokio::test]
    async fn test_admin_guard() {
        let admin = create_token(&Claims::new("admin", "admin@example.com", ROLE_ADMIN)).unwrap();
        let visitor =
            create_token(&Claims::new("u1", "reader@example.com", ROLE_VISITOR)).unwrap();

        assert_eq!(
            get_with_token(guarded_router(), "/secret", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_with_token(guarded_router(), "/secret", Some("garbage")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_with_token(guarded_router(), "/secret", Some(&visitor)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_with_token(guarded_router(), "/secret", Some(&admin)).await,
            StatusCode::OK
        );
    }
}
