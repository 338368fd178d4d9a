//! Outbound email through the Resend REST API.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

pub struct ResendMailer {
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// A mailer for the configured key, or `None` when email is disabled.
    pub fn from_config() -> Option<Self> {
        crate::config::get().resend_api_key.clone().map(Self::new)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let response = HTTP_CLIENT
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Welcome message for a new subscriber.
pub fn welcome_email(from: &str, to: &str, site_name: &str, site_url: &str) -> Email {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("email", to)
        .finish();
    let unsubscribe = format!("{site_url}/unsubscribe?{query}");
    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="background-color:#0a0a0a;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif">
    <div style="margin:0 auto;padding:40px 20px;max-width:560px">
      <h1 style="color:#ffffff;font-size:28px;text-align:center">Welcome to {site_name}!</h1>
      <hr style="border-color:#27272a;margin:24px 0">
      <p style="color:#a1a1aa;font-size:16px;line-height:24px">Hi there,</p>
      <p style="color:#a1a1aa;font-size:16px;line-height:24px">
        Thanks for subscribing. You will hear from us whenever a new post is published.
      </p>
      <p style="text-align:center;margin:32px 0">
        <a href="{site_url}" style="background-color:#a855f7;border-radius:8px;color:#ffffff;padding:12px 24px;text-decoration:none">Visit the blog</a>
      </p>
      <hr style="border-color:#27272a;margin:24px 0">
      <p style="color:#52525b;font-size:12px;text-align:center">This email was sent to {to}.</p>
      <p style="color:#52525b;font-size:12px;text-align:center">
        Not interested any more? <a href="{unsubscribe}" style="color:#a855f7">Unsubscribe</a>
      </p>
    </div>
  </body>
</html>"#
    );

    Email {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: format!("Welcome to {site_name}!"),
        html,
    }
}
