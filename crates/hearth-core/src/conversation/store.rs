//! ConversationStore trait definition.
//!
//! The relay only ever creates conversations, appends messages, reads
//! history, and sets a title once. The listing/deletion methods back the
//! conversation browsing endpoints.

use hearth_types::conversation::{Conversation, Message};
use hearth_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation and message persistence.
///
/// Implementations live in hearth-infra (e.g., `SqliteConversationStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Each call is
/// independently consistent; no transaction spans a whole relay session.
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation record.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Get a conversation by its unique ID.
    fn get_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List an owner's conversations, ordered by created_at DESC.
    fn list_conversations(
        &self,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Set the title only if the conversation has none yet.
    ///
    /// Returns `true` when this call wrote the title. An existing non-empty
    /// title is never overwritten.
    fn set_title_if_unset(
        &self,
        conversation_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Append a message to its conversation.
    fn append_message(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get all messages of a conversation, ordered by created_at ASC.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Delete one message owned by `owner_id`. Returns `false` if nothing matched.
    fn delete_message(
        &self,
        message_id: &Uuid,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
