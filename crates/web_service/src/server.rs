use std::{path::PathBuf, sync::Arc};

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::{error, info};

use chat_core::Config;
use chat_llm::ChatModelFactory;

use crate::config::{load_service_config, ServiceConfig};
use crate::controllers::{chat_controller, conversation_controller, settings_controller};
use crate::services::{SessionHub, TitleGenerator, TurnProcessor};
use crate::storage::{ConversationStore, FileStore};

pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub session_hub: Arc<SessionHub>,
    pub turn_processor: TurnProcessor,
}

impl AppState {
    pub fn new(store: Arc<dyn ConversationStore>, service_config: &ServiceConfig) -> Self {
        let factory = ChatModelFactory::new(Config::new())
            .with_connect_timeout(service_config.llm_connect_timeout);
        let resolver = Arc::new(factory);
        let title_generator =
            TitleGenerator::new(resolver.clone(), service_config.title_model.clone());
        let turn_processor = TurnProcessor::new(store.clone(), resolver, title_generator);

        Self {
            store,
            session_hub: Arc::new(SessionHub::new()),
            turn_processor,
        }
    }
}

const DEFAULT_WORKER_COUNT: usize = 10;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .configure(chat_controller::config)
            .configure(conversation_controller::config)
            .configure(settings_controller::config),
    );
}

pub async fn run(app_data_dir: PathBuf, port: u16) -> Result<(), String> {
    info!("Starting web service...");

    let service_config = load_service_config();
    let store: Arc<dyn ConversationStore> =
        Arc::new(FileStore::new(app_data_dir.join("conversations")));
    let app_state = web::Data::new(AppState::new(store, &service_config));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .workers(DEFAULT_WORKER_COUNT)
    .bind(format!("127.0.0.1:{port}"))
    .map_err(|e| format!("Failed to bind server: {e}"))?
    .run();

    info!("Web service listening on http://127.0.0.1:{port}");

    if let Err(e) = server.await {
        error!("Web server error: {}", e);
        return Err(format!("Web server error: {e}"));
    }

    Ok(())
}
