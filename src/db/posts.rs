//! Post queries, including tag resolution and engagement counters.

use chrono::Utc;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;

use super::models::{
    dedup_ids, NewPost, Post, PostSlug, PostStats, PostWithTags, Tag, UpdatePost,
};

const POST_COLUMNS: &str = "id, slug, title, description, content, cover_image, published, \
     published_at, read_time, view_count, like_count, created_at, updated_at";

#[derive(FromRow)]
struct PostTagRow {
    post_id: i32,
    #[sqlx(flatten)]
    tag: Tag,
}

async fn tags_by_post(
    conn: &mut PgConnection,
    post_ids: &[i32],
) -> Result<HashMap<i32, Vec<Tag>>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, PostTagRow>(
        r#"
        SELECT pt.post_id, t.id, t.name, t.slug, t.color
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(post_ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<i32, Vec<Tag>> = HashMap::new();
    for row in rows {
        grouped.entry(row.post_id).or_default().push(row.tag);
    }
    Ok(grouped)
}

async fn with_tags(
    conn: &mut PgConnection,
    posts: Vec<Post>,
) -> Result<Vec<PostWithTags>, sqlx::Error> {
    let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    let mut tags = tags_by_post(conn, &ids).await?;
    Ok(posts
        .into_iter()
        .map(|post| PostWithTags {
            tags: tags.remove(&post.id).unwrap_or_default(),
            post,
        })
        .collect())
}

/// Published posts, newest publication first. `limit = None` returns all.
pub async fn list_published(
    pool: &PgPool,
    limit: Option<i64>,
) -> Result<Vec<PostWithTags>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let posts = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts \
         WHERE published = true \
         ORDER BY published_at DESC NULLS LAST, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    with_tags(&mut conn, posts).await
}

/// Every post, drafts included, newest created first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<PostWithTags>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let posts = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;

    with_tags(&mut conn, posts).await
}

pub async fn find_published_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<PostWithTags>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let post = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 AND published = true"
    ))
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await?;

    match post {
        Some(post) => Ok(with_tags(&mut conn, vec![post]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<PostWithTags>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let post = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match post {
        Some(post) => Ok(with_tags(&mut conn, vec![post]).await?.pop()),
        None => Ok(None),
    }
}

/// Delete every join row of `post_id`, then insert one row per tag id.
async fn replace_tags(
    conn: &mut PgConnection,
    post_id: i32,
    tag_ids: &[i32],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if !tag_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::int[]) AS tag_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn create(pool: &PgPool, new: NewPost) -> Result<PostWithTags, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let published_at = new.published.then(Utc::now);
    let post = sqlx::query_as::<_, Post>(&format!(
        "INSERT INTO posts (title, slug, description, content, cover_image, published, \
                            published_at, read_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(&new.title)
    .bind(&new.slug)
    .bind(&new.description)
    .bind(&new.content)
    .bind(&new.cover_image)
    .bind(new.published)
    .bind(published_at)
    .bind(&new.read_time)
    .fetch_one(&mut *tx)
    .await?;

    let tag_ids = dedup_ids(new.tag_ids);
    if !tag_ids.is_empty() {
        replace_tags(&mut tx, post.id, &tag_ids).await?;
    }
    let created = with_tags(&mut tx, vec![post]).await?.pop();

    tx.commit().await?;
    created.ok_or(sqlx::Error::RowNotFound)
}

/// Apply a partial update inside one transaction. `Ok(None)` when the id is unknown.
pub async fn update(
    pool: &PgPool,
    id: i32,
    changes: UpdatePost,
) -> Result<Option<PostWithTags>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut post) = existing else {
        return Ok(None);
    };
    let tag_ids = changes.apply(&mut post, Utc::now());

    let post = sqlx::query_as::<_, Post>(&format!(
        "UPDATE posts \
         SET title = $1, slug = $2, description = $3, content = $4, cover_image = $5, \
             published = $6, published_at = $7, read_time = $8, updated_at = $9 \
         WHERE id = $10 \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.description)
    .bind(&post.content)
    .bind(&post.cover_image)
    .bind(post.published)
    .bind(post.published_at)
    .bind(&post.read_time)
    .bind(post.updated_at)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(tag_ids) = tag_ids {
        replace_tags(&mut tx, id, &tag_ids).await?;
    }
    let updated = with_tags(&mut tx, vec![post]).await?.pop();

    tx.commit().await?;
    Ok(updated)
}

/// Remove join rows first, then the post. Returns false when nothing matched.
pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn published_slugs(pool: &PgPool) -> Result<Vec<PostSlug>, sqlx::Error> {
    sqlx::query_as::<_, PostSlug>(
        "SELECT slug, updated_at FROM posts WHERE published = true ORDER BY published_at DESC NULLS LAST",
    )
    .fetch_all(pool)
    .await
}

// ============================================================================
// Engagement counters
// ============================================================================

pub async fn increment_view(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Atomically bump the like counter, returning the new total.
pub async fn increment_like(pool: &PgPool, slug: &str) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE posts SET like_count = like_count + 1 WHERE slug = $1 RETURNING like_count",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn stats(pool: &PgPool, slug: &str) -> Result<Option<PostStats>, sqlx::Error> {
    sqlx::query_as::<_, PostStats>("SELECT view_count, like_count FROM posts WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
}
