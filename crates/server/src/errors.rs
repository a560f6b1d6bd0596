use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use codbot_agent::LlmError;
use codbot_core::signature::SignatureError;
use codbot_core::{ApplicationError, DomainError, InterfaceError};
use codbot_messaging::GatewayError;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::commerce::CommerceError;

/// Failure of a webhook delivery, before or during processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Commerce(#[from] CommerceError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<WebhookError> for ApplicationError {
    fn from(value: WebhookError) -> Self {
        match value {
            WebhookError::Domain(error) => Self::Domain(error),
            WebhookError::Signature(error) => Self::Authentication(error.to_string()),
            WebhookError::Commerce(error) => Self::Integration(error.to_string()),
            WebhookError::Gateway(error) => Self::Integration(error.to_string()),
            WebhookError::Llm(LlmError::Prompt(message)) => Self::Configuration(message),
            WebhookError::Llm(error) => Self::Integration(error.to_string()),
        }
    }
}

pub fn interface_status(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let correlation_id = format!("req-{}", Uuid::new_v4().simple());
        let interface = ApplicationError::from(self).into_interface(correlation_id);

        match &interface {
            InterfaceError::Internal { message, correlation_id } => error!(
                event_name = "webhook.processing.failed",
                correlation_id = %correlation_id,
                error = %message,
                "webhook processing failed"
            ),
            InterfaceError::BadRequest { message, correlation_id }
            | InterfaceError::Unauthorized { message, correlation_id } => warn!(
                event_name = "webhook.request.rejected",
                correlation_id = %correlation_id,
                error = %message,
                "webhook request rejected"
            ),
        }

        (interface_status(&interface), interface.user_message()).into_response()
    }
}
