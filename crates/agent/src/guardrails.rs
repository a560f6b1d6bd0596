/// Substring shared by every reply that hands the customer to a person.
pub const HUMAN_REPRESENTATIVE_MARKER: &str = "A human representative will be with you shortly";

pub const FALLBACK_REPLY: &str = "I'm sorry, I'm having a little trouble thinking right now. A human representative will be with you shortly.";

pub const BOUNDARY_REPLY: &str = "I'm sorry, I can only assist with questions about our products and your order. A human representative will be with you shortly to help with that.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Answer,
    Escalate { reason_code: &'static str },
}

impl GuardrailDecision {
    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalate { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub marker: String,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self { marker: HUMAN_REPRESENTATIVE_MARKER.to_string() }
    }
}

impl EscalationPolicy {
    pub fn evaluate(&self, reply: &str) -> GuardrailDecision {
        if reply == FALLBACK_REPLY {
            GuardrailDecision::Escalate { reason_code: "llm_fallback" }
        } else if reply.contains(BOUNDARY_REPLY) {
            GuardrailDecision::Escalate { reason_code: "out_of_scope" }
        } else if reply.contains(&self.marker) {
            GuardrailDecision::Escalate { reason_code: "human_marker" }
        } else {
            GuardrailDecision::Answer
        }
    }
}
