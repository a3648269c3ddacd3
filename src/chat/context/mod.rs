mod context;
mod history;
mod message;

pub use context::ChatContext;
pub use history::{Exchange, History};
pub use message::{ChatMessage, MessageRole};
