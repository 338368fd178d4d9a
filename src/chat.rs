//! AI chat completions through the Gemini REST API.

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Tried in order until one answers.
pub const MODEL_NAMES: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro-latest",
    "gemini-pro",
];

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("AI service is not configured")]
    NotConfigured,

    #[error("AI service is temporarily unavailable")]
    Unavailable,

    #[error("model {model} failed: {reason}")]
    Model { model: &'static str, reason: String },
}

fn system_prompt(site_name: &str) -> String {
    format!(
        "You are a friendly AI assistant on a personal blog called {site_name}.\n\
         It is a technical blog about frontend development, AI, Next.js, React and related topics.\n\n\
         Your role:\n\
         - Answer visitors' questions about the blog and technical topics\n\
         - Keep a friendly, professional tone\n\
         - Keep answers short enough for a chat widget\n\
         - When unsure, point visitors to the blog posts or the guestbook"
    )
}

/// Single prompt: instructions, role-labelled history, then the new message.
pub fn build_prompt(site_name: &str, history: &[ChatTurn], message: &str) -> String {
    let history_text = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|turn| {
                let speaker = if turn.role == "user" { "User" } else { "Assistant" };
                format!("{speaker}: {}", turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{}\n\nConversation so far:\n{history_text}\n\nLatest user message: {message}\n\n\
         Reply in a concise, friendly way:",
        system_prompt(site_name)
    )
}

/// Run `call` for each model in turn and return the first success.
pub async fn complete_with_fallback<F, Fut>(
    models: &[&'static str],
    mut call: F,
) -> Result<String, ChatError>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = Result<String, ChatError>>,
{
    let mut last_error = None;
    for &model in models {
        match call(model).await {
            Ok(reply) => {
                tracing::debug!(model, "chat completion succeeded");
                return Ok(reply);
            }
            Err(e) => {
                tracing::warn!(model, error = %e, "model failed, trying next");
                last_error = Some(e);
            }
        }
    }

    if let Some(e) = last_error {
        tracing::error!(error = %e, "All Gemini models failed");
    }
    Err(ChatError::Unavailable)
}

fn extract_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

async fn generate(api_key: &str, model: &'static str, prompt: &str) -> Result<String, ChatError> {
    let fail = |reason: String| ChatError::Model { model, reason };

    let response = HTTP_CLIENT
        .post(format!("{GEMINI_BASE}/{model}:generateContent"))
        .query(&[("key", api_key)])
        .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fail(format!("upstream returned {status}")));
    }

    let body: Value = response.json().await.map_err(|e| fail(e.to_string()))?;
    extract_text(&body).ok_or_else(|| fail("response had no text".to_string()))
}

/// Answer a chat message.
pub async fn reply(request: &ChatRequest) -> Result<String, ChatError> {
    if request.message.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let config = crate::config::get();
    let api_key = config
        .gemini_api_key
        .as_deref()
        .ok_or(ChatError::NotConfigured)?;

    let prompt = build_prompt(&config.site_name, &request.history, &request.message);
    complete_with_fallback(MODEL_NAMES, |model| generate(api_key, model, &prompt)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_prompt_labels_history() {
        let history = vec![
            ChatTurn {
                role: "user".into(),
                content: "hi".into(),
            },
            ChatTurn {
                role: "assistant".into(),
                content: "hello!".into(),
            },
        ];
        let prompt = build_prompt("YuBlog", &history, "what is rust?");
        assert!(prompt.contains("YuBlog"));
        assert!(prompt.contains("User: hi\nAssistant: hello!"));
        assert!(prompt.contains("Latest user message: what is rust?"));
    }

    #[test]
    fn test_prompt_without_history() {
        let prompt = build_prompt("YuBlog", &[], "hey");
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_extract_text() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "answer" }] } }]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("answer"));
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
    }

    #[tokio::test]
    async fn test_fallback_uses_first_working_model() {
        let tried = Mutex::new(Vec::new());
        let result = complete_with_fallback(MODEL_NAMES, |model| {
            tried.lock().unwrap().push(model);
            async move {
                if model == "gemini-1.5-pro-latest" {
                    Ok(format!("from {model}"))
                } else {
                    Err(ChatError::Model {
                        model,
                        reason: "down".into(),
                    })
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "from gemini-1.5-pro-latest");
        assert_eq!(
            *tried.lock().unwrap(),
            vec!["gemini-2.0-flash", "gemini-1.5-flash-latest", "gemini-1.5-pro-latest"]
        );
    }

    #[tokio::test]
    async fn test_fallback_reports_unavailable_when_all_fail() {
        let result = complete_with_fallback(MODEL_NAMES, |model| async move {
            Err::<String, _>(ChatError::Model {
                model,
                reason: "down".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(ChatError::Unavailable)));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let request = ChatRequest {
            message: "   ".into(),
            history: Vec::new(),
        };
        assert!(matches!(reply(&request).await, Err(ChatError::EmptyMessage)));
    }
}
