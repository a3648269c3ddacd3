use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;

use crate::{
    chat::{
        context::ChatMessage,
        error::{ChatError, ChatResult},
    },
    config::structure::LLMConfig,
};

use super::decoder::ByteStream;

/// Body of `POST <base>/chat/completions`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u64,
    pub temperature: f64,
    pub stream: bool,
}

#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Sends the request and hands back the raw response body once the status was
    /// found to be a success.
    async fn send(&self, request: &CompletionRequest) -> ChatResult<ByteStream>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &LLMConfig) -> anyhow::Result<Self> {
        let endpoint = config
            .endpoint()
            .ok_or(anyhow::anyhow!("no base url configured for the completion API"))?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(&self, request: &CompletionRequest) -> ChatResult<ByteStream> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        log::debug!(
            "posting {} messages to {} (stream: {})",
            request.messages.len(),
            self.endpoint,
            request.stream
        );

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::warn!("completion endpoint answered {status}: {detail}");

            return Err(ChatError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(|why| ChatError::Interrupted(std::io::Error::other(why)))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn config(base_url: &str, api_key: Option<&str>) -> LLMConfig {
        LLMConfig {
            base_url: Some(base_url.to_string()),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
    }

    fn request(stream: bool) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user("ping")],
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 200,
            temperature: 0.0,
            stream,
        }
    }

    async fn read_all(body: ByteStream) -> String {
        let chunks: Vec<_> = body.try_collect().await.unwrap();
        String::from_utf8(chunks.concat()).unwrap()
    }

    #[tokio::test]
    async fn posts_request_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 200,
                "temperature": 0.0,
                "stream": true,
                "messages": [{ "role": "user", "content": "ping" }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: [DONE]\n\n"))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            HttpTransport::new(&config(&format!("{}/v1/", server.uri()), Some("sk-test")))
                .unwrap();
        let body = transport.send(&request(true)).await.unwrap();

        assert_eq!(read_all(body).await, "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn omits_authorization_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config(&server.uri(), None)).unwrap();
        transport.send(&request(false)).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&config(&server.uri(), None)).unwrap();
        let err = match transport.send(&request(true)).await {
            Err(err) => err,
            Ok(_) => panic!("expected an upstream error"),
        };

        assert!(matches!(err, ChatError::Upstream { status: 503, .. }));
        assert_eq!(
            err.to_string(),
            "HTTP error with the status: 503 Service Unavailable"
        );
    }

    #[tokio::test]
    async fn body_cut_short_is_an_interruption() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !(received.windows(4).any(|w| w == b"\r\n\r\n") && received.ends_with(b"}")) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\ndata: ")
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });

        let transport = HttpTransport::new(&config(&format!("http://{addr}"), None)).unwrap();
        let body = transport.send(&request(true)).await.unwrap();
        let results: Vec<ChatResult<bytes::Bytes>> = body.collect().await;

        assert!(matches!(results.last(), Some(Err(ChatError::Interrupted(_)))));
    }

    #[test]
    fn requires_base_url() {
        assert!(HttpTransport::new(&LLMConfig::default()).is_err());
    }
}
