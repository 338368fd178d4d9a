//! Guestbook submissions: authentication gate, then content validation,
//! then one insert.

use sqlx::PgPool;

use crate::db::{self, models::GuestbookEntry};

pub const MAX_MESSAGE_CHARS: usize = 100;

/// Case-insensitive substrings that reject a message.
const BANNED_WORDS: &[&str] = &["spam", "abuse", "hate"];

const ANONYMOUS_NAME: &str = "Anonymous";

/// Identity of the signed-in visitor, as asserted by their token.
#[derive(Debug, Clone, Default)]
pub struct GuestbookAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GuestbookError {
    #[error("Please sign in first")]
    Unauthenticated,

    #[error("Message cannot be empty")]
    Empty,

    #[error("Message can be at most {MAX_MESSAGE_CHARS} characters")]
    TooLong,

    #[error("Message contains inappropriate content")]
    Inappropriate,

    #[error("Failed to save message, please try again later")]
    Database(#[from] sqlx::Error),
}

fn contains_profanity(text: &str) -> bool {
    let lower = text.to_lowercase();
    BANNED_WORDS.iter().any(|word| lower.contains(word))
}

/// Length is counted in characters, not bytes.
pub fn validate_message(message: &str) -> Result<(), GuestbookError> {
    let chars = message.chars().count();
    if chars == 0 {
        return Err(GuestbookError::Empty);
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(GuestbookError::TooLong);
    }
    if contains_profanity(message) {
        return Err(GuestbookError::Inappropriate);
    }
    Ok(())
}

pub async fn submit(
    pool: &PgPool,
    author: Option<GuestbookAuthor>,
    message: &str,
) -> Result<GuestbookEntry, GuestbookError> {
    let author = author.ok_or(GuestbookError::Unauthenticated)?;
    validate_message(message)?;

    let name = author
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(ANONYMOUS_NAME);

    let entry = db::guestbook::insert(
        pool,
        name,
        message,
        author.email.as_deref(),
        author.image.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to save guestbook entry");
        GuestbookError::Database(e)
    })?;

    tracing::info!(entry_id = entry.id, "guestbook entry saved");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    #[test]
    fn test_accepts_short_clean_message() {
        assert!(validate_message("Great blog, thanks!").is_ok());
        assert!(validate_message(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_rejects_empty_and_over_length() {
        assert!(matches!(validate_message(""), Err(GuestbookError::Empty)));
        assert!(matches!(
            validate_message(&"a".repeat(101)),
            Err(GuestbookError::TooLong)
        ));
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(validate_message(&"好".repeat(100)).is_ok());
        assert!(validate_message(&"好".repeat(101)).is_err());
    }

    #[test]
    fn test_banned_words_any_case() {
        for message in ["this is spam", "SPAM!", "no AbUsE here", "i hate it"] {
            assert!(
                matches!(validate_message(message), Err(GuestbookError::Inappropriate)),
                "{message} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_rejected_before_validation() {
        let result = submit(&unreachable_pool(), None, &"x".repeat(500)).await;
        assert!(matches!(result, Err(GuestbookError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_invalid_message_never_reaches_database() {
        let author = Some(GuestbookAuthor {
            name: Some("Ada".to_string()),
            ..Default::default()
        });
        let result = submit(&unreachable_pool(), author.clone(), &"a".repeat(101)).await;
        assert!(matches!(result, Err(GuestbookError::TooLong)));

        let result = submit(&unreachable_pool(), author, "Spam spam").await;
        assert!(matches!(result, Err(GuestbookError::Inappropriate)));
    }

    #[tokio::test]
    async fn test_valid_message_attempts_insert() {
        let author = Some(GuestbookAuthor::default());
        let result = submit(&unreachable_pool(), author, "hello").await;
        assert!(matches!(result, Err(GuestbookError::Database(_))));
    }
}
