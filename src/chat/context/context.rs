use crate::config::structure::ChatConfig;

use super::{
    history::History,
    message::ChatMessage,
};

/// Builds the message list sent upstream on every turn.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub system_prompt: String,
    pub window: usize,
}

impl ChatContext {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            window: config.history_window,
        }
    }

    /// System persona, then the last `window` exchanges as user/assistant pairs, then the inquiry.
    pub fn build(&self, inquiry: &str, history: &History) -> Vec<ChatMessage> {
        let recent = history.recent(self.window);

        let mut context = Vec::with_capacity(2 + recent.len() * 2);
        context.push(ChatMessage::system(self.system_prompt.as_str()));
        for exchange in recent {
            context.push(ChatMessage::user(exchange.inquiry.as_str()));
            context.push(ChatMessage::assistant(exchange.answer.as_str()));
        }
        context.push(ChatMessage::user(inquiry));

        context
    }
}
