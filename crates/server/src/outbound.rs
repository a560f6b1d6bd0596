//! Operator-triggered sends.
//!
//! - `POST /api/send-message` — `{ phone, message }` → gateway text message

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use codbot_core::Direction;
use codbot_messaging::MessagingGateway;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::conversation_log::ConversationLogger;

#[derive(Clone)]
pub struct OutboundState {
    gateway: Arc<dyn MessagingGateway>,
    logger: ConversationLogger,
}

impl OutboundState {
    pub fn new(gateway: Arc<dyn MessagingGateway>, logger: ConversationLogger) -> Self {
        Self { gateway, logger }
    }
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub response: Value,
}

#[derive(Debug, Serialize)]
pub struct SendMessageError {
    pub error: String,
}

type ApiError = (StatusCode, Json<SendMessageError>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(SendMessageError { error: message.to_string() }))
}

pub fn router(state: OutboundState) -> Router {
    Router::new().route("/api/send-message", post(send_message)).with_state(state)
}

async fn send_message(
    State(state): State<OutboundState>,
    body: Bytes,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let request: SendMessageRequest = serde_json::from_slice(&body)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Request body must be JSON."))?;

    let phone = request.phone.filter(|phone| !phone.trim().is_empty());
    let message = request.message.filter(|message| !message.is_empty());
    let (Some(phone), Some(message)) = (phone, message) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Phone and message are required."));
    };

    let response = state.gateway.send_text(&phone, &message).await.map_err(|gateway_error| {
        error!(
            event_name = "api.send_message.failed",
            phone = %phone,
            error = %gateway_error,
            "operator message could not be sent"
        );
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send message.")
    })?;

    state.logger.record(&phone, Direction::Outbound, &message).await;
    info!(event_name = "api.send_message.sent", phone = %phone, "operator message sent");

    Ok(Json(SendMessageResponse { success: true, response: response.0 }))
}
