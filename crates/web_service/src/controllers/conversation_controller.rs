//! Read-only conversation endpoints.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use chat_core::conversation::Conversation;

use crate::error::{AppError, Result};
use crate::server::AppState;

/// Listing entry; message bodies are omitted to keep the index light.
#[derive(Serialize)]
struct ConversationSummary {
    id: String,
    title: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    message_count: usize,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            message_count: conversation.messages.len(),
        }
    }
}

/// GET /conversations
pub async fn list_conversations(state: web::Data<AppState>) -> Result<HttpResponse> {
    let conversations = state.store.list_conversations().await?;
    let summaries: Vec<ConversationSummary> =
        conversations.iter().map(ConversationSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /conversations/{id}
pub async fn get_conversation(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let conversation = state
        .store
        .get_conversation(&id)
        .await?
        .ok_or(AppError::ConversationNotFound(id))?;
    Ok(HttpResponse::Ok().json(conversation))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/conversations")
            .route("", web::get().to(list_conversations))
            .route("/{id}", web::get().to(get_conversation)),
    );
}
