use sqlx::PgPool;

use super::models::Subscriber;

/// Insert a subscriber; `Ok(None)` when the address is already present.
pub async fn insert(pool: &PgPool, email: &str) -> Result<Option<Subscriber>, sqlx::Error> {
    sqlx::query_as::<_, Subscriber>(
        "INSERT INTO subscribers (email) VALUES ($1) \
         ON CONFLICT (email) DO NOTHING \
         RETURNING email, subscribed_at",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscribers WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
