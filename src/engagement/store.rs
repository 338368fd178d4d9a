//! Per-session like counters.
//!
//! Both stores enforce the cap with a single atomic step, so concurrent likes
//! from one session can never push its counter past the cap. Counters expire
//! after a period without likes.

use async_trait::async_trait;
use moka::sync::Cache;
use sqlx::PgPool;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;

/// Result of asking the store for one more like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAttempt {
    Accepted { session_likes: u32 },
    LimitReached { session_likes: u32 },
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Count one like for `(session, slug)` unless the cap is already reached.
    async fn try_like(&self, session: &str, slug: &str) -> Result<LikeAttempt, sqlx::Error>;

    /// Give back one like that was accepted but never reached the post's
    /// counter. Never goes below zero.
    async fn release_like(&self, session: &str, slug: &str) -> Result<(), sqlx::Error>;

    /// Current (unexpired) count for `(session, slug)`.
    async fn session_likes(&self, session: &str, slug: &str) -> Result<u32, sqlx::Error>;

    /// Remove expired counters. Returns how many were dropped.
    async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        Ok(0)
    }

    fn kind(&self) -> &'static str;
}

// ============================================================================
// In-process store
// ============================================================================

/// Default number of `(session, slug)` counters kept in memory.
pub const DEFAULT_MEMORY_SESSIONS: u64 = 100_000;

/// Single-instance store backed by an expiring moka cache.
///
/// The cache holds at most `max_sessions` counters. Past that bound moka
/// evicts counters that are still live, and an evicted session starts again
/// at zero, so the cap only holds while the number of active
/// `(session, slug)` pairs stays under `max_sessions`. Size it with
/// `LIKE_MEMORY_CAPACITY`, or use [`PgLikeStore`] when that cannot be
/// guaranteed.
pub struct MemoryLikeStore {
    cap: u32,
    sessions: Cache<(String, String), Arc<AtomicU32>>,
}

impl MemoryLikeStore {
    pub fn new(cap: u32, ttl: Duration) -> Self {
        Self::with_capacity(cap, ttl, DEFAULT_MEMORY_SESSIONS)
    }

    pub fn with_capacity(cap: u32, ttl: Duration, max_sessions: u64) -> Self {
        Self {
            cap,
            sessions: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl LikeStore for MemoryLikeStore {
    async fn try_like(&self, session: &str, slug: &str) -> Result<LikeAttempt, sqlx::Error> {
        let counter = self
            .sessions
            .get_with((session.to_string(), slug.to_string()), || {
                Arc::new(AtomicU32::new(0))
            });

        let cap = self.cap;
        Ok(
            match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < cap).then_some(n + 1)
            }) {
                Ok(previous) => LikeAttempt::Accepted {
                    session_likes: previous + 1,
                },
                Err(current) => LikeAttempt::LimitReached {
                    session_likes: current,
                },
            },
        )
    }

    async fn release_like(&self, session: &str, slug: &str) -> Result<(), sqlx::Error> {
        if let Some(counter) = self.sessions.get(&(session.to_string(), slug.to_string())) {
            let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
        Ok(())
    }

    async fn session_likes(&self, session: &str, slug: &str) -> Result<u32, sqlx::Error> {
        Ok(self
            .sessions
            .get(&(session.to_string(), slug.to_string()))
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Shared store
// ============================================================================

/// Store shared by every instance through the `like_sessions` table.
pub struct PgLikeStore {
    pool: Arc<PgPool>,
    cap: u32,
    ttl: Duration,
}

impl PgLikeStore {
    pub fn new(pool: Arc<PgPool>, cap: u32, ttl: Duration) -> Self {
        Self { pool, cap, ttl }
    }

    fn ttl_secs(&self) -> f64 {
        self.ttl.as_secs_f64()
    }

    fn cap(&self) -> i32 {
        i32::try_from(self.cap).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl LikeStore for PgLikeStore {
    async fn try_like(&self, session: &str, slug: &str) -> Result<LikeAttempt, sqlx::Error> {
        // Expired counters restart at 1; the WHERE clause makes a capped row a no-op.
        let accepted = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO like_sessions (session_hash, slug, like_count, last_liked_at)
            VALUES ($1, $2, 1, now())
            ON CONFLICT (session_hash, slug) DO UPDATE SET
                like_count = CASE
                    WHEN like_sessions.last_liked_at < now() - make_interval(secs => $4) THEN 1
                    ELSE like_sessions.like_count + 1
                END,
                last_liked_at = now()
            WHERE like_sessions.like_count < $3
               OR like_sessions.last_liked_at < now() - make_interval(secs => $4)
            RETURNING like_count
            "#,
        )
        .bind(session)
        .bind(slug)
        .bind(self.cap())
        .bind(self.ttl_secs())
        .fetch_optional(self.pool.as_ref())
        .await?;

        match accepted {
            Some(count) => Ok(LikeAttempt::Accepted {
                session_likes: count.max(0) as u32,
            }),
            None => Ok(LikeAttempt::LimitReached {
                session_likes: self.session_likes(session, slug).await?,
            }),
        }
    }

    async fn session_likes(&self, session: &str, slug: &str) -> Result<u32, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT like_count FROM like_sessions
            WHERE session_hash = $1 AND slug = $2
              AND last_liked_at >= now() - make_interval(secs => $3)
            "#,
        )
        .bind(session)
        .bind(slug)
        .bind(self.ttl_secs())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(count.unwrap_or(0).max(0) as u32)
    }

    async fn release_like(&self, session: &str, slug: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE like_sessions SET like_count = like_count - 1 \
             WHERE session_hash = $1 AND slug = $2 AND like_count > 0",
        )
        .bind(session)
        .bind(slug)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM like_sessions WHERE last_liked_at < now() - make_interval(secs => $1)",
        )
        .bind(self.ttl_secs())
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryLikeStore {
        MemoryLikeStore::new(50, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_memory_store_counts_per_session_and_slug() {
        let store = store();
        assert_eq!(
            store.try_like("abc", "post-a").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 1 }
        );
        assert_eq!(
            store.try_like("abc", "post-a").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 2 }
        );
        assert_eq!(
            store.try_like("abc", "post-b").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 1 }
        );
        assert_eq!(
            store.try_like("xyz", "post-a").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 1 }
        );
        assert_eq!(store.session_likes("abc", "post-a").await.unwrap(), 2);
        assert_eq!(store.session_likes("nobody", "post-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_stops_at_cap() {
        let store = store();
        for _ in 0..49 {
            store.try_like("abc", "my-post").await.unwrap();
        }
        assert_eq!(
            store.try_like("abc", "my-post").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 50 }
        );
        assert_eq!(
            store.try_like("abc", "my-post").await.unwrap(),
            LikeAttempt::LimitReached { session_likes: 50 }
        );
        assert_eq!(store.session_likes("abc", "my-post").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_memory_store_cap_holds_under_concurrency() {
        let store = Arc::new(MemoryLikeStore::new(10, Duration::from_secs(3600)));
        let mut handles = Vec::new();
        for _ in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_like("abc", "race").await.unwrap()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), LikeAttempt::Accepted { .. }) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 10);
        assert_eq!(store.session_likes("abc", "race").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_released_like_frees_a_slot() {
        let store = MemoryLikeStore::new(2, Duration::from_secs(3600));
        store.try_like("abc", "post").await.unwrap();
        store.try_like("abc", "post").await.unwrap();
        assert!(matches!(
            store.try_like("abc", "post").await.unwrap(),
            LikeAttempt::LimitReached { .. }
        ));

        store.release_like("abc", "post").await.unwrap();
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 1);
        assert_eq!(
            store.try_like("abc", "post").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 2 }
        );
    }

    #[tokio::test]
    async fn test_release_never_goes_below_zero() {
        let store = store();
        store.release_like("abc", "unknown").await.unwrap();
        store.try_like("abc", "post").await.unwrap();
        store.release_like("abc", "post").await.unwrap();
        store.release_like("abc", "post").await.unwrap();
        assert_eq!(store.session_likes("abc", "post").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_capacity_is_configurable() {
        let store = MemoryLikeStore::with_capacity(50, Duration::from_secs(3600), 8);
        assert_eq!(
            store.try_like("abc", "post").await.unwrap(),
            LikeAttempt::Accepted { session_likes: 1 }
        );
        assert_eq!(store.sessions.policy().max_capacity(), Some(8));
    }
}
