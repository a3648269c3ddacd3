use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};

use crate::chat::error::{ChatError, ChatResult};

use super::{
    decoder::ByteStream,
    transport::{CompletionRequest, CompletionTransport},
};

type Reply = ChatResult<ByteStream>;

/// Plays back canned upstream replies in order and records every request it got.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_chunks(self, chunks: Vec<ChatResult<Bytes>>) -> Self {
        self.reply_body(stream::iter(chunks).boxed())
    }

    /// Hands `body` out as is, for replies that need to pause mid-stream.
    pub fn reply_body(self, body: ByteStream) -> Self {
        self.replies.lock().unwrap().push_back(Ok(body));
        self
    }

    /// An event stream carrying `contents` as deltas, closed by `[DONE]`.
    pub fn reply_stream(self, contents: &[&str]) -> Self {
        self.reply_chunks(vec![Ok(Bytes::from(sse(contents)))])
    }

    pub fn reply_json(self, body: serde_json::Value) -> Self {
        self.reply_chunks(vec![Ok(Bytes::from(body.to_string()))])
    }

    pub fn reply_status(self, status: u16, reason: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(ChatError::Upstream {
            status,
            reason: reason.to_string(),
        }));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn send(&self, request: &CompletionRequest) -> ChatResult<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

pub fn sse(contents: &[&str]) -> String {
    let mut body = String::new();
    for content in contents {
        let event = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}
