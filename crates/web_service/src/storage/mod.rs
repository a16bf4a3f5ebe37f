pub mod file_store;
pub mod memory_store;
mod store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use store::{ConversationStore, ConversationUpdate, MessageUpdate, StoreError};
