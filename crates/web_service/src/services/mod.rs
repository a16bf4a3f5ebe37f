pub mod title_generator;
pub mod transport;
pub mod turn_processor;

pub use title_generator::TitleGenerator;
pub use transport::{SessionHandle, SessionHub, StreamTransport};
pub use turn_processor::TurnProcessor;
