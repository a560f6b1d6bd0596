use std::sync::Arc;
use std::time::Duration;

use codbot_core::Direction;
use codbot_db::repositories::ConversationRepository;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Appends to the conversation log without ever failing the caller.
///
/// Each append is bounded by a timeout; a slow or locked store costs the
/// webhook at most that long and the message goes unlogged.
#[derive(Clone)]
pub struct ConversationLogger {
    repository: Arc<dyn ConversationRepository>,
    append_timeout: Duration,
}

impl ConversationLogger {
    pub fn new(repository: Arc<dyn ConversationRepository>) -> Self {
        Self::with_timeout(repository, DEFAULT_APPEND_TIMEOUT)
    }

    pub fn with_timeout(
        repository: Arc<dyn ConversationRepository>,
        append_timeout: Duration,
    ) -> Self {
        Self { repository, append_timeout }
    }

    pub async fn record(&self, customer_phone: &str, direction: Direction, content: &str) {
        let append = self.repository.append(customer_phone, direction, content);
        let Ok(outcome) = timeout(self.append_timeout, append).await else {
            warn!(
                event_name = "conversation.message.log_timed_out",
                phone = customer_phone,
                direction = direction.as_str(),
                timeout_ms = self.append_timeout.as_millis() as u64,
                "conversation log append timed out"
            );
            return;
        };

        match outcome {
            Ok(message) => debug!(
                event_name = "conversation.message.logged",
                phone = customer_phone,
                direction = direction.as_str(),
                sequence = message.sequence,
                "conversation message logged"
            ),
            Err(error) => warn!(
                event_name = "conversation.message.log_failed",
                phone = customer_phone,
                direction = direction.as_str(),
                error = %error,
                "failed to log conversation message"
            ),
        }
    }
}
