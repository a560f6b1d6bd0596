use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use codbot_core::domain::conversation::{Conversation, Direction, Message, MessageId};

use super::{ConversationRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, Conversation>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn append(
        &self,
        customer_phone: &str,
        direction: Direction,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .entry(customer_phone.to_string())
            .or_insert_with(|| Conversation::new(customer_phone));

        let now = Utc::now();
        let created_at = conversation
            .messages()
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now);
        let message = Message {
            id: MessageId(format!("MSG-{}", Uuid::new_v4().simple())),
            customer_phone: customer_phone.to_string(),
            direction,
            content: content.to_string(),
            sequence: conversation.next_sequence(),
            created_at,
        };

        conversation.append(message.clone()).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(message)
    }

    async fn conversation(&self, customer_phone: &str) -> Result<Conversation, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(customer_phone)
            .cloned()
            .unwrap_or_else(|| Conversation::new(customer_phone)))
    }
}
