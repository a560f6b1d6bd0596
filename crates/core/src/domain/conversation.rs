use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown message direction `{other}`"
            ))),
        }
    }
}

/// One immutable entry of a customer's conversation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub customer_phone: String,
    pub direction: Direction,
    pub content: String,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// Append-only message log keyed by the customer's phone number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    customer_phone: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(customer_phone: impl Into<String>) -> Self {
        Self { customer_phone: customer_phone.into(), messages: Vec::new() }
    }

    pub fn customer_phone(&self) -> &str {
        &self.customer_phone
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn next_sequence(&self) -> i64 {
        self.messages.last().map(|message| message.sequence + 1).unwrap_or(1)
    }

    pub fn append(&mut self, message: Message) -> Result<(), DomainError> {
        if message.customer_phone != self.customer_phone {
            return Err(DomainError::InvariantViolation(format!(
                "message for `{}` appended to conversation `{}`",
                message.customer_phone, self.customer_phone
            )));
        }

        if let Some(last) = self.messages.last() {
            if message.sequence <= last.sequence || message.created_at < last.created_at {
                return Err(DomainError::InvariantViolation(format!(
                    "conversation `{}` must grow monotonically (last sequence {}, got {})",
                    self.customer_phone, last.sequence, message.sequence
                )));
            }
        }

        self.messages.push(message);
        Ok(())
    }
}
