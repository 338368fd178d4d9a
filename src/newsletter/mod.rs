//! Newsletter subscriptions.

pub mod mailer;

use regex::Regex;
use sqlx::PgPool;

use crate::db::{self, models::Subscriber};
use mailer::{welcome_email, Mailer};

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum NewsletterError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("This email is already subscribed")]
    AlreadySubscribed,

    #[error("{message}")]
    Database {
        message: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Record a subscription, then send the welcome email.
///
/// A failed send is logged and does not undo the subscription.
pub async fn subscribe(
    pool: &PgPool,
    mailer: Option<&dyn Mailer>,
    email: &str,
) -> Result<Subscriber, NewsletterError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(NewsletterError::InvalidEmail);
    }

    let subscriber = db::subscribers::insert(pool, email)
        .await
        .map_err(|source| {
            tracing::error!(error = %source, "Failed to subscribe");
            NewsletterError::Database {
                message: "Failed to subscribe, please try again later",
                source,
            }
        })?
        .ok_or(NewsletterError::AlreadySubscribed)?;

    tracing::info!("new newsletter subscriber");

    if let Some(mailer) = mailer {
        let config = crate::config::get();
        let message = welcome_email(
            &config.newsletter_from,
            &subscriber.email,
            &config.site_name,
            &config.site_url,
        );
        if let Err(e) = mailer.send(&message).await {
            tracing::error!(error = %e, "Failed to send welcome email");
        }
    }

    Ok(subscriber)
}

/// Remove an address. Unknown addresses are not an error.
pub async fn unsubscribe(pool: &PgPool, email: &str) -> Result<(), NewsletterError> {
    let removed = db::subscribers::delete(pool, email.trim())
        .await
        .map_err(|source| {
            tracing::error!(error = %source, "Failed to unsubscribe");
            NewsletterError::Database {
                message: "Failed to unsubscribe",
                source,
            }
        })?;
    tracing::info!(removed, "newsletter unsubscribe");
    Ok(())
}
