//! Client-facing settings: the closed list of logical model names.

use actix_web::{web, HttpResponse};
use serde_json::json;

use chat_llm::AVAILABLE_MODELS;

/// GET /settings
pub async fn get_settings() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "models": AVAILABLE_MODELS }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/settings", web::get().to(get_settings));
}
