use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use crate::{
    chat::{
        context::ChatMessage,
        error::{ChatError, ChatResult},
    },
    config::structure::LLMConfig,
};

use super::{
    decoder::decode_fragments,
    transport::{CompletionRequest, CompletionTransport},
};

/// Receives each piece of the answer as soon as it is decoded.
pub type FragmentSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Answers are meant to be reproducible.
const TEMPERATURE: f64 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u64,
    pub streaming: bool,
}

impl From<&LLMConfig> for CompletionSettings {
    fn from(config: &LLMConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            streaming: config.streaming,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl ChatCompletion {
    fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.content
    }
}

pub struct AnswerAssembler {
    transport: Arc<dyn CompletionTransport>,
    settings: CompletionSettings,
}

impl AnswerAssembler {
    pub fn new(transport: Arc<dyn CompletionTransport>, settings: CompletionSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Streams when streaming is enabled and someone listens for fragments, otherwise
    /// makes one plain request. Either way the complete answer is returned.
    pub async fn assemble(
        &self,
        messages: Vec<ChatMessage>,
        on_fragment: Option<&mut FragmentSink<'_>>,
    ) -> ChatResult<String> {
        match on_fragment {
            Some(sink) if self.settings.streaming => self.streamed(messages, sink).await,
            sink => self.single_shot(messages, sink).await,
        }
    }

    async fn streamed(
        &self,
        messages: Vec<ChatMessage>,
        on_fragment: &mut FragmentSink<'_>,
    ) -> ChatResult<String> {
        let body = self.transport.send(&self.request(messages, true)).await?;
        let mut fragments = decode_fragments(body);

        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            answer.push_str(&fragment);
        }

        Ok(answer)
    }

    async fn single_shot(
        &self,
        messages: Vec<ChatMessage>,
        on_fragment: Option<&mut FragmentSink<'_>>,
    ) -> ChatResult<String> {
        let body = self.transport.send(&self.request(messages, false)).await?;
        let bytes = body
            .try_fold(Vec::new(), |mut bytes, chunk| async move {
                bytes.extend_from_slice(&chunk);
                Ok(bytes)
            })
            .await?;

        let completion: ChatCompletion = serde_json::from_slice(&bytes)?;
        let answer = completion
            .into_content()
            .ok_or(ChatError::MissingContent)?
            .trim()
            .to_string();

        if let Some(sink) = on_fragment {
            if !answer.is_empty() {
                sink(&answer);
            }
        }

        Ok(answer)
    }

    fn request(&self, messages: Vec<ChatMessage>, stream: bool) -> CompletionRequest {
        CompletionRequest {
            messages,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: TEMPERATURE,
            stream,
        }
    }
}
