//! Turn submission and the per-session SSE stream.

use std::time::Duration;

use actix_web::{web, HttpResponse};
use actix_web_lab::sse;
use actix_web_lab::util::InfallibleStream;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;
use crate::models::MessageIn;
use crate::server::AppState;

/// POST /chat/{session_id}/messages
///
/// Runs one full turn. Partial output streams to the session's SSE
/// consumer while this request is in flight; the response body is the
/// final assistant event.
pub async fn post_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<MessageIn>,
) -> Result<HttpResponse> {
    let session_id = path.into_inner();
    let request = body.into_inner();

    log::info!(
        "[{}] Turn request for conversation {} (model {})",
        session_id,
        request.conversation_id,
        request.metadata.llm.model
    );

    let transport = state.session_hub.handle(&session_id);
    let final_event = state.turn_processor.process(request, &transport).await?;
    Ok(HttpResponse::Ok().json(final_event))
}

/// GET /chat/{session_id}/stream
///
/// Attaches the single SSE consumer for a session, replacing any
/// previous connection.
pub async fn stream(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> sse::Sse<InfallibleStream<ReceiverStream<sse::Event>>> {
    let session_id = path.into_inner();
    log::info!("[{}] Stream attached", session_id);

    let rx = state.session_hub.subscribe(&session_id);
    sse::Sse::from_infallible_receiver(rx).with_keep_alive(Duration::from_secs(15))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .route("/{session_id}/messages", web::post().to(post_message))
            .route("/{session_id}/stream", web::get().to(stream)),
    );
}
