use sqlx::PgPool;

use super::models::{NewTag, Tag, UpdateTag};

pub async fn list(pool: &PgPool) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>("SELECT id, name, slug, color FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn create(pool: &PgPool, new: NewTag) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (name, slug, color) VALUES ($1, $2, $3) RETURNING id, name, slug, color",
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.color)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: i32, changes: UpdateTag) -> Result<Option<Tag>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Tag>(
        "SELECT id, name, slug, color FROM tags WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut tag) = existing else {
        return Ok(None);
    };
    changes.apply(&mut tag);

    let tag = sqlx::query_as::<_, Tag>(
        "UPDATE tags SET name = $1, slug = $2, color = $3 WHERE id = $4 \
         RETURNING id, name, slug, color",
    )
    .bind(&tag.name)
    .bind(&tag.slug)
    .bind(&tag.color)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(tag))
}

/// Remove the tag's join rows first, then the tag itself.
pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM post_tags WHERE tag_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
