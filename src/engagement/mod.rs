//! View and like counters for posts.

pub mod store;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{self, models::PostStats};
pub use store::{LikeAttempt, LikeStore, MemoryLikeStore, PgLikeStore};

/// Likes one anonymous session may give a single post.
pub const MAX_LIKES_PER_SESSION: u32 = 50;

static LIKE_STORE: OnceCell<Arc<dyn LikeStore>> = OnceCell::new();

/// Install the process-wide like store. Only the first call wins.
pub fn install_like_store(store: Arc<dyn LikeStore>) {
    if LIKE_STORE.set(store).is_err() {
        tracing::warn!("like store already installed, ignoring replacement");
    }
}

/// The installed store, or an in-memory one when none was configured.
pub fn like_store() -> Arc<dyn LikeStore> {
    LIKE_STORE
        .get_or_init(|| {
            let config = crate::config::get();
            let ttl = Duration::from_secs(config.like_session_ttl_hours * 3600);
            Arc::new(MemoryLikeStore::with_capacity(
                MAX_LIKES_PER_SESSION,
                ttl,
                config.like_memory_capacity,
            ))
        })
        .clone()
}

/// Anonymous visitor id: first 16 hex chars of sha256("{ip}-{user_agent}").
pub fn session_hash(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{ip}-{user_agent}").as_bytes());
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(16);
    digest
}

/// Count a view without making the caller wait for the write.
pub fn spawn_view_increment(pool: Arc<PgPool>, slug: String) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match db::posts::increment_view(&pool, &slug).await {
            Ok(true) => tracing::debug!(slug = %slug, "view counted"),
            Ok(false) => tracing::debug!(slug = %slug, "view for unknown post ignored"),
            Err(e) => tracing::error!(slug = %slug, error = %e, "Failed to increment view count"),
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked { like_count: i32, session_likes: u32 },
    LimitReached { session_likes: u32 },
    PostNotFound,
}

/// Like a post on behalf of `session`.
///
/// The post's `like_count` only moves after the session store accepted the
/// like, so a capped session never changes the stored total. A like the
/// counter never recorded is handed back to the session.
pub async fn like_post(
    store: &dyn LikeStore,
    pool: &PgPool,
    session: &str,
    slug: &str,
) -> Result<LikeOutcome, sqlx::Error> {
    if db::posts::stats(pool, slug).await?.is_none() {
        return Ok(LikeOutcome::PostNotFound);
    }

    let session_likes = match store.try_like(session, slug).await? {
        LikeAttempt::LimitReached { session_likes } => {
            tracing::info!(slug = %slug, session = %session, "like limit reached");
            return Ok(LikeOutcome::LimitReached { session_likes });
        }
        LikeAttempt::Accepted { session_likes } => session_likes,
    };

    let counted = db::posts::increment_like(pool, slug).await;
    settle_like(store, session, slug, session_likes, counted).await
}

/// Turn the post-counter update into an outcome. When the counter did not
/// move (post gone, or the update failed) the session gets its like back.
async fn settle_like(
    store: &dyn LikeStore,
    session: &str,
    slug: &str,
    session_likes: u32,
    counted: Result<Option<i32>, sqlx::Error>,
) -> Result<LikeOutcome, sqlx::Error> {
    match counted {
        Ok(Some(like_count)) => Ok(LikeOutcome::Liked {
            like_count,
            session_likes,
        }),
        Ok(None) => {
            release(store, session, slug).await;
            Ok(LikeOutcome::PostNotFound)
        }
        Err(e) => {
            release(store, session, slug).await;
            Err(e)
        }
    }
}

async fn release(store: &dyn LikeStore, session: &str, slug: &str) {
    if let Err(e) = store.release_like(session, slug).await {
        tracing::warn!(slug = %slug, error = %e, "Failed to release session like");
    }
}

/// Stored counters for a post; zeros when unknown or on error.
pub async fn post_stats(pool: &PgPool, slug: &str) -> PostStats {
    match db::posts::stats(pool, slug).await {
        Ok(stats) => stats.unwrap_or_default(),
        Err(e) => {
            tracing::error!(slug = %slug, error = %e, "Failed to get post stats");
            PostStats::default()
        }
    }
}

pub async fn session_likes(store: &dyn LikeStore, session: &str, slug: &str) -> u32 {
    store.session_likes(session, slug).await.unwrap_or_else(|e| {
        tracing::error!(slug = %slug, error = %e, "Failed to get session likes");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_hash_is_16_hex_chars_and_stable() {
        let a = session_hash("203.0.113.7", "Mozilla/5.0");
        let b = session_hash("203.0.113.7", "Mozilla/5.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_hash_depends_on_ip_and_agent() {
        let base = session_hash("203.0.113.7", "Mozilla/5.0");
        assert_ne!(base, session_hash("203.0.113.8", "Mozilla/5.0"));
        assert_ne!(base, session_hash("203.0.113.7", "curl/8.0"));
    }

    #[test]
    fn test_session_hash_matches_sha256_prefix() {
        let mut hasher = Sha256::new();
        hasher.update(b"unknown-unknown");
        let full = format!("{:x}", hasher.finalize());
        assert_eq!(session_hash("unknown", "unknown"), &full[..16]);
    }

    #[tokio::test]
    async fn test_like_store_defaults_to_memory() {
        assert_eq!(like_store().kind(), "memory");
    }

    #[tokio::test]
    async fn test_like_post_fails_without_reachable_database() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let store = MemoryLikeStore::new(MAX_LIKES_PER_SESSION, Duration::from_secs(60));

        assert!(like_post(&store, &pool, "abc", "post").await.is_err());
        // The session counter is untouched when the post lookup failed.
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_uncounted_like_is_returned_to_session() {
        let store = MemoryLikeStore::new(MAX_LIKES_PER_SESSION, Duration::from_secs(60));
        store.try_like("abc", "post").await.unwrap();

        // Post deleted between the lookup and the counter update.
        let outcome = settle_like(&store, "abc", "post", 1, Ok(None)).await.unwrap();
        assert_eq!(outcome, LikeOutcome::PostNotFound);
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 0);

        // Counter update failed.
        store.try_like("abc", "post").await.unwrap();
        let failed = settle_like(&store, "abc", "post", 1, Err(sqlx::Error::PoolTimedOut)).await;
        assert!(failed.is_err());
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counted_like_keeps_session_slot() {
        let store = MemoryLikeStore::new(MAX_LIKES_PER_SESSION, Duration::from_secs(60));
        store.try_like("abc", "post").await.unwrap();

        let outcome = settle_like(&store, "abc", "post", 1, Ok(Some(7))).await.unwrap();
        assert_eq!(
            outcome,
            LikeOutcome::Liked {
                like_count: 7,
                session_likes: 1
            }
        );
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 1);
    }
}
