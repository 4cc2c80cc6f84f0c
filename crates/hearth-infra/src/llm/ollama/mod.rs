//! OllamaClient -- concrete [`ChatUpstream`] for a local Ollama server.
//!
//! Posts to `{base_url}/api/chat` with `stream: true` and exposes the NDJSON
//! reply as a [`FrameStream`]. The request is only considered open once the
//! server has answered with a success status; anything else is reported
//! before the first frame.

pub mod streaming;
pub mod types;

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use hearth_core::llm::upstream::{ChatUpstream, FrameStream};
use hearth_types::config::UpstreamConfig;
use hearth_types::llm::{ChatRequest, UpstreamError};

use streaming::create_ollama_stream;

/// Streaming client for the Ollama chat endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    max_stream: Duration,
}

impl OllamaClient {
    /// Build a client.
    ///
    /// Only the connect phase has a timeout; the streamed body is bounded by
    /// `max_stream` instead, measured from the moment the request is sent.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        max_stream: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| UpstreamError::Connect(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_stream,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.max_stream_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

impl ChatUpstream for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    #[tracing::instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn open_stream(
        &self,
        mut request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<FrameStream, UpstreamError> {
        request.stream = true;
        let deadline = Instant::now() + self.max_stream;

        let send = self.client.post(self.chat_url()).json(&request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => {
                return Err(UpstreamError::DeadlineExceeded(self.max_stream.as_secs()));
            }
            result = send => result.map_err(|e| {
                tracing::warn!(error = %e, url = %self.base_url, "upstream connect failed");
                UpstreamError::Connect(e.to_string())
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "upstream rejected chat request");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = %status, "upstream stream opened");
        Ok(create_ollama_stream(response, cancel, deadline, self.max_stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::{Body, Bytes};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use futures_util::StreamExt;
    use hearth_types::llm::{ChatOptions, MessageRole, PromptMessage, StreamFrame};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn ndjson(chunks: &[&'static str], hang: bool) -> Response {
        let head = futures_util::stream::iter(
            chunks
                .iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c.as_bytes())))
                .collect::<Vec<_>>(),
        );
        let body = if hang {
            Body::from_stream(head.chain(futures_util::stream::pending()))
        } else {
            Body::from_stream(head)
        };
        ([("content-type", "application/x-ndjson")], body).into_response()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "llama3.1:8b".to_string(),
            stream: false,
            messages: vec![PromptMessage::new(MessageRole::User, "Hi")],
            options: ChatOptions::default(),
        }
    }

    fn client(base_url: &str, max_stream: Duration) -> OllamaClient {
        OllamaClient::new(base_url, Duration::from_secs(2), max_stream).unwrap()
    }

    async fn drain(stream: FrameStream) -> Vec<Result<StreamFrame, UpstreamError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_streams_deltas_until_done() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async {
                ndjson(
                    &[
                        "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"mess",
                        "age\":{\"content\":\"lo\"},\"done\":false}\n",
                        "{\"done\":true}\n",
                        "{\"message\":{\"content\":\"ignored\"},\"done\":false}\n",
                    ],
                    false,
                )
            }),
        ))
        .await;

        let stream = client(&base, Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();
        let frames: Vec<StreamFrame> = drain(stream).await.into_iter().map(|f| f.unwrap()).collect();

        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("Hel".to_string()),
                StreamFrame::Delta("lo".to_string()),
                StreamFrame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_sends_streaming_request_body() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::default();
        let captured = seen.clone();
        let base = serve(Router::new().route(
            "/api/chat",
            post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    ndjson(&["{\"done\":true}\n"], false)
                }
            }),
        ))
        .await;

        let stream = client(&format!("{base}/"), Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();
        drain(stream).await;

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["options"]["repeat_penalty"], 1.2);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async {
                ndjson(
                    &[
                        "garbage\n",
                        "{\"message\":{\"content\":\"ok\"},\"done\":false}\n",
                        "{\"done\":true}",
                    ],
                    false,
                )
            }),
        ))
        .await;

        let stream = client(&base, Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();
        let frames: Vec<StreamFrame> = drain(stream).await.into_iter().map(|f| f.unwrap()).collect();

        assert_eq!(
            frames,
            vec![StreamFrame::Delta("ok".to_string()), StreamFrame::Done]
        );
    }

    #[tokio::test]
    async fn test_end_of_body_without_done_ends_cleanly() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async { ndjson(&["{\"message\":{\"content\":\"partial\"},\"done\":false}\n"], false) }),
        ))
        .await;

        let stream = client(&base, Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();
        let frames = drain(stream).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].as_ref().unwrap(),
            &StreamFrame::Delta("partial".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_success_status_fails_before_frames() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::NOT_FOUND, "model \"nope\" not found") }),
        ))
        .await;

        let result = client(&base, Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await;

        match result {
            Err(UpstreamError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a status error"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(&format!("http://{addr}"), Duration::from_secs(30))
            .open_stream(request(), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(UpstreamError::Connect(_))));
    }

    #[tokio::test]
    async fn test_cancel_ends_stream_with_cancelled() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async { ndjson(&["{\"message\":{\"content\":\"a\"},\"done\":false}\n"], true) }),
        ))
        .await;

        let cancel = CancellationToken::new();
        let mut stream = client(&base, Duration::from_secs(30))
            .open_stream(request(), cancel.clone())
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, StreamFrame::Delta("a".to_string()));

        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(UpstreamError::Cancelled))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_open() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client("http://127.0.0.1:9", Duration::from_secs(30))
            .open_stream(request(), cancel)
            .await;

        assert!(matches!(result, Err(UpstreamError::Cancelled)));
    }

    #[tokio::test]
    async fn test_max_duration_is_cancellation_class() {
        let base = serve(Router::new().route(
            "/api/chat",
            post(|| async { ndjson(&["{\"message\":{\"content\":\"slow\"},\"done\":false}\n"], true) }),
        ))
        .await;

        let stream = client(&base, Duration::from_millis(300))
            .open_stream(request(), CancellationToken::new())
            .await
            .unwrap();
        let frames = drain(stream).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].as_ref().unwrap(),
            &StreamFrame::Delta("slow".to_string())
        );
        let err = frames[1].as_ref().unwrap_err();
        assert!(matches!(err, UpstreamError::DeadlineExceeded(_)));
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = UpstreamConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..UpstreamConfig::default()
        };
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
        assert_eq!(client.name(), "ollama");
    }
}
