//! In-memory store and scripted upstream used by the relay tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hearth_types::conversation::{Conversation, Message};
use hearth_types::error::RepositoryError;
use hearth_types::llm::{ChatRequest, StreamFrame, UpstreamError};

use crate::conversation::store::ConversationStore;
use crate::llm::upstream::{ChatUpstream, FrameStream};
use crate::relay::session::RelayBody;

#[derive(Default)]
struct StoreInner {
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    title_writes: usize,
    fail_appends: bool,
}

/// `ConversationStore` backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn fail_appends(&self, fail: bool) {
        self.inner.lock().unwrap().fail_appends = fail;
    }

    pub fn conversation(&self, id: &Uuid) -> Option<Conversation> {
        self.inner.lock().unwrap().conversations.get(id).cloned()
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.lock().unwrap().conversations.len()
    }

    pub fn messages_of(&self, id: &Uuid) -> Vec<Message> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == *id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        messages
    }

    pub fn title_writes(&self) -> usize {
        self.inner.lock().unwrap().title_writes
    }
}

impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.conversation(conversation_id))
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    async fn set_title_if_unset(
        &self,
        conversation_id: &Uuid,
        title: &str,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let written = match inner.conversations.get_mut(conversation_id) {
            Some(c) if !c.has_title() => {
                c.title = Some(title.to_string());
                true
            }
            Some(_) => false,
            None => return Err(RepositoryError::NotFound),
        };
        if written {
            inner.title_writes += 1;
        }
        Ok(written)
    }

    async fn append_message(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_appends {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        Ok(self.messages_of(conversation_id))
    }

    async fn delete_message(&self, message_id: &Uuid, owner_id: &str) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.messages.len();
        inner
            .messages
            .retain(|m| !(m.id == *message_id && m.owner_id == owner_id));
        Ok(inner.messages.len() != before)
    }
}

/// One scripted upstream event.
pub enum Step {
    Delta(String),
    Done,
    Fail(UpstreamError),
    /// Park until the session token fires, then end as cancelled.
    WaitForCancel,
}

#[derive(Default)]
struct UpstreamInner {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    requests: Mutex<Vec<ChatRequest>>,
    connect_error: Mutex<Option<UpstreamError>>,
    dropped: Arc<AtomicBool>,
}

/// `ChatUpstream` that replays queued scripts, one per `open_stream` call.
#[derive(Clone, Default)]
pub struct ScriptedUpstream {
    inner: Arc<UpstreamInner>,
}

impl ScriptedUpstream {
    pub fn new(script: Vec<Step>) -> Self {
        let upstream = Self::default();
        upstream.push_script(script);
        upstream
    }

    pub fn failing(error: UpstreamError) -> Self {
        let upstream = Self::default();
        *upstream.inner.connect_error.lock().unwrap() = Some(error);
        upstream
    }

    pub fn push_script(&self, script: Vec<Step>) {
        self.inner.scripts.lock().unwrap().push_back(script);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// Whether the last opened frame stream has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::SeqCst)
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ChatUpstream for ScriptedUpstream {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<FrameStream, UpstreamError> {
        self.inner.requests.lock().unwrap().push(request);
        if let Some(err) = self.inner.connect_error.lock().unwrap().take() {
            return Err(err);
        }

        let steps = self.inner.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let dropped = self.inner.dropped.clone();
        dropped.store(false, Ordering::SeqCst);

        Ok(Box::pin(async_stream::stream! {
            let _guard = SetOnDrop(dropped);
            for step in steps {
                match step {
                    Step::Delta(text) => yield Ok(StreamFrame::Delta(text)),
                    Step::Done => {
                        yield Ok(StreamFrame::Done);
                        break;
                    }
                    Step::Fail(err) => {
                        yield Err(err);
                        break;
                    }
                    Step::WaitForCancel => {
                        cancel.cancelled().await;
                        yield Err(UpstreamError::Cancelled);
                        break;
                    }
                }
            }
        }))
    }
}

/// Drain a body, panicking on stream errors.
pub async fn collect_body(body: RelayBody) -> Vec<String> {
    body.map(|chunk| chunk.expect("body chunk"))
        .collect::<Vec<_>>()
        .await
}
