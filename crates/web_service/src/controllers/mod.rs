pub mod chat_controller;
pub mod conversation_controller;
pub mod settings_controller;
