use std::sync::Arc;

use tracing::info;

use codbot_core::KnowledgeBase;

use crate::guardrails::{EscalationPolicy, GuardrailDecision, FALLBACK_REPLY};
use crate::llm::{LlmClient, LlmError};
use crate::prompt::{PromptBuilder, PromptContext};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub escalate: bool,
}

pub struct GenerativeResponder {
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    guardrails: EscalationPolicy,
    knowledge_base: KnowledgeBase,
}

impl GenerativeResponder {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: PromptBuilder,
        knowledge_base: KnowledgeBase,
    ) -> Self {
        Self { llm, prompts, guardrails: EscalationPolicy::default(), knowledge_base }
    }

    pub async fn respond(&self, context: &PromptContext) -> Result<AssistantReply, LlmError> {
        let prompt = self.prompts.render(&self.knowledge_base, context)?;
        let text = match self.llm.complete(&prompt).await? {
            Some(text) => text,
            None => FALLBACK_REPLY.to_string(),
        };

        let decision = self.guardrails.evaluate(&text);
        if let GuardrailDecision::Escalate { reason_code } = &decision {
            info!(
                event_name = "assistant.reply.escalated",
                reason_code,
                order_name = context.order_name.as_deref().unwrap_or(""),
                "assistant reply hands the customer to a human"
            );
        }

        Ok(AssistantReply { text, escalate: decision.is_escalation() })
    }
}
