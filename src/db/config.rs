//! Site configuration key/value store.

use sqlx::PgPool;

use super::models::SiteConfig;

pub async fn all(pool: &PgPool) -> Result<Vec<SiteConfig>, sqlx::Error> {
    sqlx::query_as::<_, SiteConfig>("SELECT key, value, description FROM site_config ORDER BY key")
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &PgPool, key: &str) -> Result<Option<SiteConfig>, sqlx::Error> {
    sqlx::query_as::<_, SiteConfig>("SELECT key, value, description FROM site_config WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Rows for the requested keys only; unknown keys are simply not returned.
pub async fn values(pool: &PgPool, keys: &[String]) -> Result<Vec<SiteConfig>, sqlx::Error> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, SiteConfig>(
        "SELECT key, value, description FROM site_config WHERE key = ANY($1)",
    )
    .bind(keys)
    .fetch_all(pool)
    .await
}

/// Insert-or-update in a single statement. A given description replaces the
/// stored one; `None` keeps it.
pub async fn set(
    pool: &PgPool,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> Result<SiteConfig, sqlx::Error> {
    sqlx::query_as::<_, SiteConfig>(
        r#"
        INSERT INTO site_config (key, value, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (key) DO UPDATE SET
            value = EXCLUDED.value,
            description = COALESCE(EXCLUDED.description, site_config.description)
        RETURNING key, value, description
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(description)
    .fetch_one(pool)
    .await
}
