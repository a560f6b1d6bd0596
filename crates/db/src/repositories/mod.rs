use async_trait::async_trait;
use thiserror::Error;

use codbot_core::domain::conversation::{Conversation, Direction, Message};

pub mod conversation;
pub mod memory;

pub use conversation::SqlConversationRepository;
pub use memory::InMemoryConversationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Append-only storage for per-customer conversation logs.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Appends one message after the last stored one and returns it with its
    /// assigned sequence and timestamp.
    async fn append(
        &self,
        customer_phone: &str,
        direction: Direction,
        content: &str,
    ) -> Result<Message, RepositoryError>;

    async fn conversation(&self, customer_phone: &str) -> Result<Conversation, RepositoryError>;
}
