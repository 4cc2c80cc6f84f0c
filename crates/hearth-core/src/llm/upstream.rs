//! ChatUpstream trait definition.
//!
//! Opening a stream is a two-step contract: the returned future resolves
//! only once the model server has accepted the request (so connect errors
//! surface before any byte reaches the client), and the stream it yields is
//! the lazy sequence of decoded frames.

use std::pin::Pin;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use hearth_types::llm::{ChatRequest, StreamFrame, UpstreamError};

/// Boxed, forward-only sequence of decoded upstream frames.
///
/// Ends after a `StreamFrame::Done`, at end of body, or with an
/// `UpstreamError` (cancellation-class errors are distinguishable via
/// [`UpstreamError::is_cancellation`]).
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame, UpstreamError>> + Send + 'static>>;

/// Trait for the streaming model server client.
///
/// Implementations live in hearth-infra (e.g., `OllamaClient`).
pub trait ChatUpstream: Send + Sync {
    /// Human-readable upstream name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a streaming chat request.
    ///
    /// Fails with `UpstreamError::Status` or `UpstreamError::Connect` before
    /// producing any frame. Once `cancel` fires the stream ends with
    /// `UpstreamError::Cancelled` and the underlying request is dropped.
    fn open_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<FrameStream, UpstreamError>> + Send;
}
