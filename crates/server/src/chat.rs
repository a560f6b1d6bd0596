//! Chat webhook: maps a customer's WhatsApp reply onto one fixed action.
//!
//! - `GET  /api/gupshup-webhook` — liveness text
//! - `POST /api/gupshup-webhook` — inbound gateway event

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Router};
use codbot_agent::{GenerativeResponder, PromptContext};
use codbot_core::config::{PaymentConfig, WorkflowConfig};
use codbot_core::{CustomerAction, CustomerId, Direction, DomainError, PendingOrder};
use codbot_messaging::{parse_inbound, InboundEvent, InboundMessage, MessagingGateway, Reply};
use tracing::info;

use crate::commerce::CommerceClient;
use crate::conversation_log::ConversationLogger;
use crate::errors::WebhookError;

pub const LIVENESS_TEXT: &str = "Webhook is active and listening for POST requests.";

pub struct InboundDispatcher {
    commerce: Arc<dyn CommerceClient>,
    gateway: Arc<dyn MessagingGateway>,
    responder: Arc<GenerativeResponder>,
    logger: ConversationLogger,
    workflow: WorkflowConfig,
    payment: PaymentConfig,
}

/// What the dispatcher did with one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub action: CustomerAction,
    pub order_name: Option<String>,
    pub escalated: bool,
}

impl InboundDispatcher {
    pub fn new(
        commerce: Arc<dyn CommerceClient>,
        gateway: Arc<dyn MessagingGateway>,
        responder: Arc<GenerativeResponder>,
        logger: ConversationLogger,
        workflow: WorkflowConfig,
        payment: PaymentConfig,
    ) -> Self {
        Self { commerce, gateway, responder, logger, workflow, payment }
    }

    pub async fn dispatch(
        &self,
        message: &InboundMessage,
    ) -> Result<DispatchOutcome, WebhookError> {
        let phone = message.customer_phone.as_str();
        self.logger.record(phone, Direction::Inbound, &message.text).await;

        let order = self
            .commerce
            .find_pending_order(phone, &self.workflow.awaiting_confirmation_tag)
            .await?;
        let action = CustomerAction::parse(&message.text);

        let (reply, escalated) = match (&action, order.as_ref()) {
            (CustomerAction::ConfirmOrder, Some(order)) => {
                self.commerce
                    .add_tags(&order.id.0, &[self.workflow.confirmed_tag.clone()])
                    .await?;
                (Reply::OrderConfirmed { order_name: order.display_name().to_string() }, false)
            }
            (CustomerAction::CancelOrder, Some(order)) => {
                self.commerce.cancel_order(&order.id).await?;
                (Reply::OrderCancelled { order_name: order.display_name().to_string() }, false)
            }
            (CustomerAction::PaymentDetails, _) => (Reply::payment_details(&self.payment), false),
            (CustomerAction::NeedInformation, order) => {
                let assistant = self
                    .responder
                    .respond(&PromptContext {
                        customer_name: order
                            .and_then(PendingOrder::customer_first_name)
                            .map(str::to_string),
                        order_name: order.map(|order| order.display_name().to_string()),
                        customer_message: message.text.clone(),
                    })
                    .await?;
                if assistant.escalate {
                    self.escalate(phone, order).await?;
                }
                (Reply::Assistant { text: assistant.text }, assistant.escalate)
            }
            _ => {
                let reason =
                    if action.requires_order() { "no_pending_order" } else { "free_text" };
                info!(event_name = "webhook.chat.handoff", phone, reason, "routing to a human");
                self.escalate(phone, order.as_ref()).await?;
                (Reply::HumanHandoff, true)
            }
        };

        let text = reply.render();
        self.gateway.send_text(phone, &text).await?;
        self.logger.record(phone, Direction::Outbound, &text).await;

        Ok(DispatchOutcome {
            action,
            order_name: order.as_ref().map(|order| order.display_name().to_string()),
            escalated,
        })
    }

    /// Tags the customer for human follow-up; no resolvable customer means no tag.
    async fn escalate(
        &self,
        phone: &str,
        order: Option<&PendingOrder>,
    ) -> Result<Option<CustomerId>, WebhookError> {
        let customer_id = match order.and_then(PendingOrder::customer_id) {
            Some(id) => Some(id.clone()),
            None => self.commerce.find_customer_id(phone).await?,
        };

        match &customer_id {
            Some(id) => {
                self.commerce
                    .add_tags(&id.0, &[self.workflow.human_assistance_tag.clone()])
                    .await?;
                info!(
                    event_name = "webhook.chat.escalated",
                    phone,
                    customer_id = %id.0,
                    "customer tagged for human assistance"
                );
            }
            None => info!(
                event_name = "webhook.chat.escalation_skipped",
                phone,
                "no customer record found for escalation tag"
            ),
        }

        Ok(customer_id)
    }
}

pub fn router(dispatcher: Arc<InboundDispatcher>) -> Router {
    Router::new()
        .route("/api/gupshup-webhook", get(liveness).post(chat_webhook))
        .with_state(dispatcher)
}

async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, LIVENESS_TEXT)
}

async fn chat_webhook(
    State(dispatcher): State<Arc<InboundDispatcher>>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event = parse_inbound(&body)
        .map_err(|error| DomainError::MalformedPayload(error.to_string()))?;

    let message = match event {
        InboundEvent::Message(message) => message,
        InboundEvent::NotAMessage { event_type } => {
            info!(
                event_name = "webhook.chat.ignored",
                event_type = event_type.as_deref().unwrap_or("missing"),
                "ignoring non-message gateway event"
            );
            return Ok((StatusCode::OK, "OK: Not a user message."));
        }
        InboundEvent::Incomplete => return Ok((StatusCode::OK, "OK: Incomplete payload.")),
    };

    info!(
        event_name = "webhook.chat.received",
        phone = %message.customer_phone,
        "chat reply received"
    );
    let outcome = dispatcher.dispatch(&message).await?;
    info!(
        event_name = "webhook.chat.processed",
        phone = %message.customer_phone,
        action = outcome.action.action_key(),
        order_name = outcome.order_name.as_deref().unwrap_or(""),
        escalated = outcome.escalated,
        "chat reply processed"
    );
    Ok((StatusCode::OK, "OK: Processed."))
}
