//! Order-created webhook: sends the cash-on-delivery confirmation template.
//!
//! - `POST /api/shopify-webhook` — signed `orders/create` notification

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use codbot_core::config::WorkflowConfig;
use codbot_core::domain::order::{advance_payment, format_amount, parse_amount};
use codbot_core::{signature, Direction, DomainError, OrderId, PhoneNormalizer};
use codbot_messaging::{MessagingGateway, OrderNotification};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::commerce::CommerceClient;
use crate::conversation_log::ConversationLogger;
use crate::errors::WebhookError;

pub const SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";

const DEFAULT_CUSTOMER_NAME: &str = "Valued Customer";
const DEFAULT_PRODUCT_NAME: &str = "Your Jewelry";
const MISSING_ADDRESS: &str = "Address not provided";

#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub total_price: Option<Value>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerPayload>,
    #[serde(default)]
    pub shipping_address: Option<AddressPayload>,
    #[serde(default)]
    pub line_items: Vec<LineItemPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressPayload {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemPayload {
    #[serde(default)]
    pub name: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl OrderPayload {
    pub fn is_deferred_payment(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        !keyword.is_empty()
            && self
                .gateway
                .as_deref()
                .is_some_and(|gateway| gateway.to_lowercase().contains(&keyword))
    }

    /// Shipping phone, then customer phone, then order phone.
    pub fn contact_phone(&self, normalizer: &PhoneNormalizer) -> Option<String> {
        let raw = non_blank(self.shipping_address.as_ref().and_then(|a| a.phone.as_ref()))
            .or_else(|| non_blank(self.customer.as_ref().and_then(|c| c.phone.as_ref())))
            .or_else(|| non_blank(self.phone.as_ref()));
        normalizer.normalize(raw)
    }

    fn total_text(&self) -> String {
        match &self.total_price {
            Some(Value::String(raw)) => raw.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn shipping_line(&self) -> String {
        let Some(address) = &self.shipping_address else {
            return MISSING_ADDRESS.to_string();
        };
        let parts: Vec<&str> =
            [non_blank(address.address1.as_ref()), non_blank(address.city.as_ref())]
                .into_iter()
                .flatten()
                .collect();
        if parts.is_empty() {
            MISSING_ADDRESS.to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn notification(
        &self,
        workflow: &WorkflowConfig,
    ) -> Result<OrderNotification, DomainError> {
        let total = parse_amount(&self.total_text())?;
        let advance = advance_payment(total, workflow.advance_percent)?;

        Ok(OrderNotification {
            customer_name: non_blank(self.customer.as_ref().and_then(|c| c.first_name.as_ref()))
                .unwrap_or(DEFAULT_CUSTOMER_NAME)
                .to_string(),
            order_name: self.name.clone(),
            product_name: non_blank(self.line_items.first().and_then(|item| item.name.as_ref()))
                .unwrap_or(DEFAULT_PRODUCT_NAME)
                .to_string(),
            order_amount: format_amount(total, &workflow.currency),
            advance_payment: format_amount(advance, &workflow.currency),
            shipping_address: self.shipping_line(),
        })
    }
}

pub struct OrderNotifier {
    commerce: Arc<dyn CommerceClient>,
    gateway: Arc<dyn MessagingGateway>,
    logger: ConversationLogger,
    workflow: WorkflowConfig,
    normalizer: PhoneNormalizer,
    webhook_secret: SecretString,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    DeferredPayment,
    NoPhone,
    Sent,
}

impl NotifyOutcome {
    pub fn acknowledgement(&self) -> &'static str {
        match self {
            Self::DeferredPayment => "OK: Bank Deposit order, no action taken.",
            Self::NoPhone => "OK: No phone number.",
            Self::Sent => "Webhook processed successfully.",
        }
    }
}

impl OrderNotifier {
    pub fn new(
        commerce: Arc<dyn CommerceClient>,
        gateway: Arc<dyn MessagingGateway>,
        logger: ConversationLogger,
        workflow: WorkflowConfig,
        normalizer: PhoneNormalizer,
        webhook_secret: SecretString,
    ) -> Self {
        Self { commerce, gateway, logger, workflow, normalizer, webhook_secret }
    }

    pub async fn handle(
        &self,
        body: &[u8],
        claimed_signature: Option<&str>,
    ) -> Result<NotifyOutcome, WebhookError> {
        signature::verify(self.webhook_secret.expose_secret().as_bytes(), body, claimed_signature)?;

        let order: OrderPayload = serde_json::from_slice(body)
            .map_err(|error| DomainError::MalformedPayload(error.to_string()))?;

        if order.is_deferred_payment(&self.workflow.deferred_payment_keyword) {
            info!(
                event_name = "webhook.order.deferred_payment",
                order_name = %order.name,
                gateway = order.gateway.as_deref().unwrap_or(""),
                "deferred payment order, no confirmation sent"
            );
            return Ok(NotifyOutcome::DeferredPayment);
        }

        let Some(phone) = order.contact_phone(&self.normalizer) else {
            warn!(
                event_name = "webhook.order.no_phone",
                order_name = %order.name,
                "order has no usable phone number"
            );
            return Ok(NotifyOutcome::NoPhone);
        };
        let notification = order.notification(&self.workflow)?;

        self.gateway.send_template(&phone, &notification.params()).await?;
        self.logger
            .record(
                &phone,
                Direction::Outbound,
                &format!("Sent COD confirmation for order {}", order.name),
            )
            .await;

        let order_id = OrderId::from_numeric(order.id);
        self.commerce
            .add_tags(&order_id.0, &[self.workflow.awaiting_confirmation_tag.clone()])
            .await?;

        info!(
            event_name = "webhook.order.confirmation_sent",
            order_name = %order.name,
            phone = %phone,
            "real-time confirmation sent for new order"
        );
        Ok(NotifyOutcome::Sent)
    }
}

pub fn router(notifier: Arc<OrderNotifier>) -> Router {
    Router::new().route("/api/shopify-webhook", post(order_created)).with_state(notifier)
}

async fn order_created(
    State(notifier): State<Arc<OrderNotifier>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let claimed = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    let outcome = notifier.handle(&body, claimed).await?;
    Ok((StatusCode::OK, outcome.acknowledgement()))
}
