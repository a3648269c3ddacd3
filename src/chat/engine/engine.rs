use std::sync::Arc;

use chrono::Utc;

use crate::{
    chat::{
        client::{AnswerAssembler, CompletionTransport, FragmentSink, HttpTransport},
        context::{ChatContext, Exchange, History},
        error::ChatResult,
    },
    config::store::ChatBotConfig,
    utils::misc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingAnswer,
    Completed,
    Failed,
}

/// Owns the conversation history and runs turns against it.
pub struct ChatEngine {
    assembler: AnswerAssembler,
    context: ChatContext,
    history: History,
    state: TurnState,
}

impl ChatEngine {
    pub fn new(config: &ChatBotConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.llm)?;

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &ChatBotConfig, transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            assembler: AnswerAssembler::new(transport, (&config.llm).into()),
            context: ChatContext::new(&config.chat),
            history: History::new(),
            state: TurnState::Idle,
        }
    }

    /// Runs one turn. The exchange is only recorded when an answer came back, so a
    /// failed turn leaves nothing behind for the next one.
    pub async fn turn(
        &mut self,
        inquiry: String,
        on_fragment: Option<&mut FragmentSink<'_>>,
    ) -> ChatResult<Exchange> {
        self.state = TurnState::AwaitingAnswer;
        if self.history.is_empty() {
            log::debug!("starting a new conversation");
        }
        log::info!("    Human: {inquiry}");

        let messages = self.context.build(&inquiry, &self.history);
        let started = Utc::now();

        match self.assembler.assemble(messages, on_fragment).await {
            Ok(answer) => {
                let elapsed = Utc::now() - started;
                log::info!("Assistant: {answer}");
                log::info!("       (in {})", misc::elapsed_to_string(elapsed));

                let exchange = Exchange::new(inquiry, answer, elapsed.num_milliseconds());
                self.history.push(exchange.clone());
                self.state = TurnState::Completed;
                log::debug!(
                    "exchange #{} recorded at {} ({} ms)",
                    self.history.len(),
                    exchange.completed_at,
                    exchange.duration_ms
                );

                Ok(exchange)
            }
            Err(why) => {
                log::error!(
                    "turn failed after {}: {why}",
                    misc::elapsed_to_string(Utc::now() - started)
                );
                self.state = TurnState::Failed;

                Err(why)
            }
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> TurnState {
        self.state
    }
}
