pub mod service;

pub use service::{ConversationService, ConversationStream};
