use axum::Json;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{self, ChatError, ChatRequest},
    error::{AppError, AppResult},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => AppError::BadRequest(err.to_string()),
            ChatError::NotConfigured | ChatError::Unavailable | ChatError::Model { .. } => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

/// POST /api/chat
pub async fn chat(Json(request): Json<ChatRequest>) -> AppResult<Json<ChatReply>> {
    let reply = chat::reply(&request).await?;
    Ok(Json(ChatReply { reply }))
}
