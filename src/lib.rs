//! Blog Backend - library for app logic and testing

pub mod cache;
pub mod chat;
pub mod config;
pub mod content;
pub mod db;
pub mod engagement;
pub mod error;
pub mod guestbook;
pub mod logging;
pub mod newsletter;
pub mod routes;
pub mod seo;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::LikeStoreKind;
use crate::engagement::{LikeStore, MemoryLikeStore, PgLikeStore, MAX_LIKES_PER_SESSION};

const LIKE_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend in development.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    let admin = routes::admin::router()
        .route_layer(middleware::from_fn(routes::auth::require_admin));

    Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify_token))
        // Posts and engagement
        .route("/api/posts", get(routes::blog::list_posts))
        .route("/api/posts/latest", get(routes::blog::latest_posts))
        .route("/api/posts/{slug}", get(routes::blog::get_post))
        .route("/api/posts/{slug}/view", post(routes::blog::record_view))
        .route("/api/posts/{slug}/like", post(routes::blog::like_post))
        .route("/api/posts/{slug}/stats", get(routes::blog::post_stats))
        .route(
            "/api/posts/{slug}/session-likes",
            get(routes::blog::session_likes),
        )
        // Portfolio and site settings
        .route("/api/projects", get(routes::portfolio::list_projects))
        .route(
            "/api/projects/featured",
            get(routes::portfolio::featured_projects),
        )
        .route("/api/skills", get(routes::portfolio::list_skills))
        .route("/api/timeline", get(routes::portfolio::list_timeline))
        .route("/api/config", get(routes::portfolio::config_values))
        .route("/api/config/{key}", get(routes::portfolio::config_value))
        // Visitors
        .route(
            "/api/guestbook",
            get(routes::guestbook::list_entries).post(routes::guestbook::create_entry),
        )
        .route("/api/chat", post(routes::chat::chat))
        .route(
            "/api/newsletter/subscribe",
            post(routes::newsletter::subscribe),
        )
        .route(
            "/api/newsletter/unsubscribe",
            post(routes::newsletter::unsubscribe),
        )
        .route("/sitemap.xml", get(routes::seo::sitemap_xml))
        .route("/og", get(routes::seo::og_image))
        .nest("/api/admin", admin)
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
}

/// Pick the like store for this process and start its expiry sweep.
fn install_like_store() {
    let config = config::get();
    let ttl = Duration::from_secs(config.like_session_ttl_hours * 3600);
    let in_memory = || -> Arc<dyn LikeStore> {
        Arc::new(MemoryLikeStore::with_capacity(
            MAX_LIKES_PER_SESSION,
            ttl,
            config.like_memory_capacity,
        ))
    };

    let store: Arc<dyn LikeStore> = match (config.like_store, db::get_pool()) {
        (LikeStoreKind::Postgres, Some(pool)) => {
            Arc::new(PgLikeStore::new(pool, MAX_LIKES_PER_SESSION, ttl))
        }
        (LikeStoreKind::Postgres, None) => {
            tracing::warn!("No database for the shared like store, counting likes in memory");
            in_memory()
        }
        (LikeStoreKind::Memory, _) => in_memory(),
    };
    tracing::info!(kind = store.kind(), "like store installed");
    engagement::install_like_store(store);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIKE_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match engagement::like_store().purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired like sessions removed"),
                Err(e) => tracing::warn!("Failed to purge like sessions: {}", e),
            }
        }
    });
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Dropping the guards shuts down the background log writers.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = config::get();

    // Refuse to start in production with the insecure default JWT secret.
    if config.is_production() {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == routes::auth::DEFAULT_JWT_SECRET {
            tracing::error!(
                "JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
            std::process::exit(1);
        }

        let admin_email = std::env::var("ADMIN_EMAIL").unwrap_or_default();
        let admin_password_set =
            std::env::var("ADMIN_HASH_PASSWORD").is_ok() || std::env::var("ADMIN_PASSWORD").is_ok();

        if admin_email.is_empty() || admin_email == "admin@example.com" {
            tracing::warn!("SECURITY: ADMIN_EMAIL is using an insecure default.");
        }
        if !admin_password_set {
            tracing::warn!(
                "SECURITY: Neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set. \
                 Set ADMIN_HASH_PASSWORD to a bcrypt hash of a strong password."
            );
        }
    }

    if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
    }

    install_like_store();

    if config.gemini_api_key.is_none() {
        tracing::info!("GEMINI_API_KEY not set. Chat will answer with a configuration error.");
    }
    if config.resend_api_key.is_none() {
        tracing::info!("RESEND_API_KEY not set. Welcome emails are disabled.");
    }

    let app = create_app();

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid HOST/PORT configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
    }
}
