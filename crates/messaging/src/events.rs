use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub customer_phone: String,
    pub text: String,
}

/// Classification of one chat webhook delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    Message(InboundMessage),
    /// Delivery receipts, status updates and other non-message events.
    NotAMessage { event_type: Option<String> },
    /// A message event without reply text or sender phone.
    Incomplete,
}

#[derive(Debug, Error)]
pub enum InboundParseError {
    #[error("failed to parse request body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-empty string at `pointer`; a missing field or any other JSON type yields `None`.
fn non_empty_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str).filter(|text| !text.is_empty())
}

/// Any well-formed JSON body is classified; only unparsable bytes are an error.
pub fn parse_inbound(body: &[u8]) -> Result<InboundEvent, InboundParseError> {
    let envelope: Value = serde_json::from_slice(body)?;

    let event_type = envelope.get("type").and_then(Value::as_str);
    if event_type != Some("message") {
        return Ok(InboundEvent::NotAMessage { event_type: event_type.map(str::to_string) });
    }

    let text = non_empty_str(&envelope, "/payload/payload/text");
    let phone = non_empty_str(&envelope, "/payload/sender/phone");

    match (text, phone) {
        (Some(text), Some(customer_phone)) => Ok(InboundEvent::Message(InboundMessage {
            customer_phone: customer_phone.to_string(),
            text: text.to_string(),
        })),
        _ => Ok(InboundEvent::Incomplete),
    }
}
