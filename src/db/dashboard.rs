//! Aggregates for the admin overview page.

use sqlx::PgPool;

use super::models::{DashboardCounts, PostSummary};

pub async fn counts(pool: &PgPool) -> Result<DashboardCounts, sqlx::Error> {
    sqlx::query_as::<_, DashboardCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM posts) AS posts,
            (SELECT COUNT(*) FROM projects) AS projects,
            (SELECT COUNT(*) FROM tags) AS tags,
            (SELECT COUNT(*) FROM skills) AS skills,
            (SELECT COUNT(*) FROM guestbook_entries) AS guestbook,
            (SELECT COUNT(*) FROM subscribers) AS subscribers,
            (SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM posts) AS total_views,
            (SELECT COALESCE(SUM(like_count), 0)::BIGINT FROM posts) AS total_likes
        "#,
    )
    .fetch_one(pool)
    .await
}

pub async fn top_viewed(pool: &PgPool, limit: i64) -> Result<Vec<PostSummary>, sqlx::Error> {
    sqlx::query_as::<_, PostSummary>(
        "SELECT id, slug, title, published, view_count, like_count, created_at \
         FROM posts ORDER BY view_count DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<PostSummary>, sqlx::Error> {
    sqlx::query_as::<_, PostSummary>(
        "SELECT id, slug, title, published, view_count, like_count, created_at \
         FROM posts ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
