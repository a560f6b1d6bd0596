use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use codbot_core::domain::conversation::{Conversation, Direction, Message, MessageId};

use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    // Fixed width so lexical order in SQL matches chronological order.
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid created_at `{raw}`: {error}")))
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_phone: String =
        row.try_get("customer_phone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let sequence: i64 =
        row.try_get("sequence").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let direction_str: String =
        row.try_get("direction").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Message {
        id: MessageId(id),
        customer_phone,
        direction: direction_str
            .parse::<Direction>()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        content,
        sequence,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn append(
        &self,
        customer_phone: &str,
        direction: Direction,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let id = format!("MSG-{}", Uuid::new_v4().simple());

        // Sequence and timestamp are derived in the same statement so two
        // concurrent appends for one phone cannot interleave out of order.
        let row = sqlx::query(
            "INSERT INTO conversation_message
                 (id, customer_phone, sequence, direction, content, created_at)
             SELECT ?1, ?2, COALESCE(MAX(sequence), 0) + 1, ?3, ?4,
                    MAX(?5, COALESCE(MAX(created_at), ?5))
             FROM conversation_message
             WHERE customer_phone = ?2
             RETURNING id, customer_phone, sequence, direction, content, created_at",
        )
        .bind(&id)
        .bind(customer_phone)
        .bind(direction.as_str())
        .bind(content)
        .bind(timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await?;

        row_to_message(&row)
    }

    async fn conversation(&self, customer_phone: &str) -> Result<Conversation, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, customer_phone, sequence, direction, content, created_at
             FROM conversation_message
             WHERE customer_phone = ?
             ORDER BY sequence ASC",
        )
        .bind(customer_phone)
        .fetch_all(&self.pool)
        .await?;

        let mut conversation = Conversation::new(customer_phone);
        for row in &rows {
            conversation
                .append(row_to_message(row)?)
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        }
        Ok(conversation)
    }
}
