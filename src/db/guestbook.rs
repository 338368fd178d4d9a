use sqlx::PgPool;

use super::models::GuestbookEntry;

const ENTRY_COLUMNS: &str = "id, user_name, message, created_by_email, user_image, created_at";

/// Newest first; `limit = None` returns everything.
pub async fn list(pool: &PgPool, limit: Option<i64>) -> Result<Vec<GuestbookEntry>, sqlx::Error> {
    sqlx::query_as::<_, GuestbookEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM guestbook_entries ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn insert(
    pool: &PgPool,
    user_name: &str,
    message: &str,
    email: Option<&str>,
    image: Option<&str>,
) -> Result<GuestbookEntry, sqlx::Error> {
    sqlx::query_as::<_, GuestbookEntry>(&format!(
        "INSERT INTO guestbook_entries (user_name, message, created_by_email, user_image) \
         VALUES ($1, $2, $3, $4) RETURNING {ENTRY_COLUMNS}"
    ))
    .bind(user_name)
    .bind(message)
    .bind(email)
    .bind(image)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM guestbook_entries WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
