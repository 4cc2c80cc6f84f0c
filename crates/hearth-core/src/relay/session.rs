//! Relay session: one chat turn from request to persisted reply.
//!
//! States: `Initializing -> AwaitingConversation -> StreamingUpstream ->
//! {Completed | Aborted | Failed}`.
//!
//! [`ChatRelay::start`] runs everything up to and including the upstream
//! connect, so every error it returns happens before the first byte. On
//! success it hands back the conversation id and a live [`RelayBody`], and
//! spawns the pump task that forwards frames and then runs the exit action
//! (persist the reply, set the title) after the client stream is closed.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use hearth_types::chat::{ChatTurn, SendMessageRequest};
use hearth_types::conversation::{Conversation, Message, MessageRole};
use hearth_types::error::RelayError;
use hearth_types::llm::{ChatOptions, ChatRequest, StreamFrame};

use crate::conversation::store::ConversationStore;
use crate::llm::upstream::{ChatUpstream, FrameStream};
use crate::relay::context::build_prompt;
use crate::relay::title::synthesize_title;

/// Settings shared by every session of a relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Model used when the request omits one.
    pub default_model: String,
    pub options: ChatOptions,
    /// Chunks buffered between the pump task and the client body.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.1:8b".to_string(),
            options: ChatOptions::default(),
            channel_capacity: 32,
        }
    }
}

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Initializing,
    AwaitingConversation,
    StreamingUpstream,
    Finished(RelayOutcome),
}

/// How the streaming phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The upstream sent `done` (or closed the body cleanly).
    Completed,
    /// The client went away, cancelled explicitly, or the deadline hit.
    Aborted,
    /// Transport or decode failure after streaming began.
    Failed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Initializing => write!(f, "initializing"),
            RelayState::AwaitingConversation => write!(f, "awaiting_conversation"),
            RelayState::StreamingUpstream => write!(f, "streaming_upstream"),
            RelayState::Finished(RelayOutcome::Completed) => write!(f, "completed"),
            RelayState::Finished(RelayOutcome::Aborted) => write!(f, "aborted"),
            RelayState::Finished(RelayOutcome::Failed) => write!(f, "failed"),
        }
    }
}

/// Error delivered on the client body when the upstream fails mid-stream.
#[derive(Debug, thiserror::Error)]
#[error("upstream stream failed: {0}")]
pub struct RelayStreamError(pub String);

/// What the pump task did, returned through [`RelayStream::task`].
#[derive(Debug, Clone)]
pub struct RelayReport {
    pub outcome: RelayOutcome,
    /// Text forwarded to the client, in order.
    pub assistant_text: String,
    /// Whether the assistant message was stored.
    pub persisted: bool,
    /// Title written by this session, if any.
    pub title: Option<String>,
}

/// Client-facing byte stream of a session.
///
/// Dropping it (client disconnect) cancels the session's token, which stops
/// the upstream read at its next pending poll.
pub struct RelayBody {
    rx: mpsc::Receiver<Result<String, RelayStreamError>>,
    _cancel_on_drop: DropGuard,
}

impl Stream for RelayBody {
    type Item = Result<String, RelayStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// A started relay session.
pub struct RelayStream {
    /// Resolved (possibly newly created) conversation.
    pub conversation_id: Uuid,
    pub body: RelayBody,
    /// Explicit cancellation handle for the session.
    pub cancel: CancellationToken,
    /// Pump task; callers may detach it.
    pub task: JoinHandle<RelayReport>,
}

/// Runs relay sessions against a conversation store and an upstream client.
///
/// Generic over `ConversationStore` and `ChatUpstream` to maintain clean
/// architecture (hearth-core never depends on hearth-infra).
pub struct ChatRelay<S: ConversationStore, U: ChatUpstream> {
    store: Arc<S>,
    upstream: Arc<U>,
    config: RelayConfig,
}

impl<S, U> ChatRelay<S, U>
where
    S: ConversationStore + 'static,
    U: ChatUpstream,
{
    /// Create a relay over shared store and upstream handles.
    pub fn new(store: Arc<S>, upstream: Arc<U>, config: RelayConfig) -> Self {
        Self {
            store,
            upstream,
            config,
        }
    }

    /// Access the conversation store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start a session for `owner_id`.
    ///
    /// Errors are returned only for failures before streaming begins:
    /// validation, store access, and upstream connect.
    pub async fn start(
        &self,
        owner_id: &str,
        request: SendMessageRequest,
    ) -> Result<RelayStream, RelayError> {
        let mut state = RelayState::Initializing;
        tracing::debug!(%state, "relay session started");
        let turn = validate_request(request, &self.config.default_model)?;

        state = RelayState::AwaitingConversation;
        tracing::debug!(%state, model = %turn.model, "chat turn validated");
        let (conversation_id, had_title) = self
            .resolve_conversation(owner_id, turn.conversation_id)
            .await?;

        let user_message = Message::new(
            conversation_id,
            owner_id,
            MessageRole::User,
            turn.message.clone(),
        );
        self.store.append_message(&user_message).await?;

        let history: Vec<Message> = self
            .store
            .list_messages(&conversation_id)
            .await?
            .into_iter()
            .filter(|m| m.id != user_message.id)
            .collect();

        let prompt = build_prompt(&turn.model, &history, &turn.message)?;
        let request = ChatRequest {
            model: turn.model.clone(),
            stream: true,
            messages: prompt,
            options: self.config.options.clone(),
        };

        let cancel = CancellationToken::new();
        let frames = self.upstream.open_stream(request, cancel.clone()).await?;

        state = RelayState::StreamingUpstream;
        tracing::info!(
            %state,
            conversation_id = %conversation_id,
            upstream = self.upstream.name(),
            history_len = history.len(),
            "relay streaming"
        );

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let finish = FinishContext {
            conversation_id,
            owner_id: owner_id.to_string(),
            user_text: turn.message,
            had_title,
        };
        let span = tracing::info_span!("relay", conversation_id = %conversation_id);
        let task = tokio::spawn(
            pump(self.store.clone(), frames, tx, cancel.clone(), finish).instrument(span),
        );

        Ok(RelayStream {
            conversation_id,
            body: RelayBody {
                rx,
                _cancel_on_drop: cancel.clone().drop_guard(),
            },
            cancel,
            task,
        })
    }

    /// Create a conversation or load an existing one owned by `owner_id`.
    ///
    /// Returns the id and whether it already had a title.
    async fn resolve_conversation(
        &self,
        owner_id: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<(Uuid, bool), RelayError> {
        match conversation_id {
            None => {
                let conversation = self
                    .store
                    .create_conversation(&Conversation::new(owner_id))
                    .await?;
                tracing::info!(conversation_id = %conversation.id, "conversation created");
                Ok((conversation.id, false))
            }
            Some(id) => {
                let conversation = self
                    .store
                    .get_conversation(&id)
                    .await?
                    .filter(|c| c.owner_id == owner_id)
                    .ok_or(RelayError::ConversationNotFound)?;
                Ok((conversation.id, conversation.has_title()))
            }
        }
    }
}

/// Validate the raw payload into a [`ChatTurn`].
///
/// `message` must be a non-blank string; `model` (when present and not null)
/// a non-blank string; `conversationId` (when present and not null) a UUID.
pub fn validate_request(
    request: SendMessageRequest,
    default_model: &str,
) -> Result<ChatTurn, RelayError> {
    let message = match request.message {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            return Err(RelayError::Validation(
                "Message is required and must be a non-empty string".to_string(),
            ));
        }
    };

    let model = match request.model {
        None | Some(serde_json::Value::Null) => default_model.to_string(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => {
            return Err(RelayError::Validation(
                "Model must be a non-empty string".to_string(),
            ));
        }
    };

    let conversation_id = match request.conversation_id {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(
            Uuid::parse_str(s.trim())
                .map_err(|_| RelayError::Validation(format!("Invalid conversationId: {s}")))?,
        ),
        Some(other) => {
            return Err(RelayError::Validation(format!(
                "Invalid conversationId: {other}"
            )));
        }
    };

    Ok(ChatTurn {
        message,
        model,
        conversation_id,
    })
}

/// Everything the exit action needs once streaming stops.
struct FinishContext {
    conversation_id: Uuid,
    owner_id: String,
    user_text: String,
    had_title: bool,
}

/// Forward frames to the client, then run the exit action.
async fn pump<S: ConversationStore>(
    store: Arc<S>,
    mut frames: FrameStream,
    tx: mpsc::Sender<Result<String, RelayStreamError>>,
    cancel: CancellationToken,
    finish: FinishContext,
) -> RelayReport {
    let mut accumulated = String::new();

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break RelayOutcome::Aborted,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(StreamFrame::Delta(text))) => {
                if !forward(&tx, &cancel, Ok(text.clone())).await {
                    break RelayOutcome::Aborted;
                }
                accumulated.push_str(&text);
            }
            Some(Ok(StreamFrame::Done)) | None => break RelayOutcome::Completed,
            Some(Err(e)) if e.is_cancellation() => {
                tracing::info!(reason = %e, "relay stream cancelled");
                break RelayOutcome::Aborted;
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "relay stream failed");
                forward(&tx, &cancel, Err(RelayStreamError(e.to_string()))).await;
                break RelayOutcome::Failed;
            }
        }
    };

    // Close the client stream and the upstream request before persisting.
    drop(tx);
    drop(frames);

    let state = RelayState::Finished(outcome);
    tracing::info!(%state, chars = accumulated.len(), "relay stream finished");

    persist_reply(store.as_ref(), finish, outcome, accumulated).await
}

/// Hand one item to the client body.
///
/// Waits for channel capacity, but gives up as soon as the session is
/// cancelled so a client that stops reading cannot pin the upstream open.
/// Returns `false` if the item was not delivered.
async fn forward(
    tx: &mpsc::Sender<Result<String, RelayStreamError>>,
    cancel: &CancellationToken,
    item: Result<String, RelayStreamError>,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        permit = tx.reserve() => match permit {
            Ok(permit) => {
                permit.send(item);
                true
            }
            // Receiver gone: the body was dropped without its guard firing first.
            Err(_) => false,
        },
    }
}

/// Exit action: store the reply and, for untitled conversations, the title.
///
/// Failures are logged only; the client already has the streamed text.
async fn persist_reply<S: ConversationStore>(
    store: &S,
    finish: FinishContext,
    outcome: RelayOutcome,
    accumulated: String,
) -> RelayReport {
    let mut report = RelayReport {
        outcome,
        assistant_text: accumulated,
        persisted: false,
        title: None,
    };

    if report.assistant_text.is_empty() {
        return report;
    }

    let message = Message::new(
        finish.conversation_id,
        finish.owner_id,
        MessageRole::Assistant,
        report.assistant_text.clone(),
    );
    if let Err(e) = store.append_message(&message).await {
        tracing::error!(error = %e, "failed to persist assistant message");
        return report;
    }
    report.persisted = true;

    if !finish.had_title {
        let title = synthesize_title(&finish.user_text);
        match store
            .set_title_if_unset(&finish.conversation_id, &title)
            .await
        {
            Ok(true) => {
                tracing::info!(%title, "conversation titled");
                report.title = Some(title);
            }
            Ok(false) => tracing::debug!("conversation already titled"),
            Err(e) => tracing::warn!(error = %e, "failed to set conversation title"),
        }
    }

    report
}
