use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codbot_agent::{LlmClient, LlmError};
use codbot_core::config::AppConfig;
use codbot_core::{CustomerId, CustomerRef, OrderId, PendingOrder};
use codbot_messaging::{GatewayError, GatewayResponse, MessagingGateway};
use serde_json::json;

use crate::commerce::{CommerceClient, CommerceError};

pub const TEST_WEBHOOK_SECRET: &str = "whsec-test";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.messaging.api_key = "gs-test".to_string().into();
    config.messaging.source_number = "917834811114".to_string();
    config.messaging.app_name = "ringshing".to_string();
    config.messaging.order_template_id = "tmpl-cod-1".to_string();
    config.commerce.store_domain = "ringshing.myshopify.com".to_string();
    config.commerce.access_token = "shpat_test".to_string().into();
    config.commerce.webhook_secret = TEST_WEBHOOK_SECRET.to_string().into();
    config.llm.api_key = "gemini-test".to_string().into();
    config.payment.bank_name = "Meezan Bank".to_string();
    config.payment.account_title = "Ringshing".to_string();
    config.payment.account_number = "0123456789".to_string();
    config
}

pub fn pending_order(name: &str) -> PendingOrder {
    PendingOrder {
        id: OrderId(format!("gid://shopify/Order/{}", name.trim_start_matches('#'))),
        name: name.to_string(),
        customer: Some(CustomerRef {
            id: CustomerId("gid://shopify/Customer/7".to_string()),
            first_name: Some("Ayesha".to_string()),
        }),
        tags: vec!["COD-Confirmation-Sent".to_string()],
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommerceCall {
    FindPendingOrder { phone: String, tag: String },
    FindCustomer { phone: String },
    AddTags { resource_id: String, tags: Vec<String> },
    CancelOrder { order_id: String },
}

impl CommerceCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::AddTags { .. } | Self::CancelOrder { .. })
    }
}

#[derive(Default)]
pub struct RecordingCommerce {
    pending: Option<PendingOrder>,
    customer: Option<CustomerId>,
    fail_lookups: bool,
    calls: Mutex<Vec<CommerceCall>>,
}

impl RecordingCommerce {
    pub fn with_pending(order: PendingOrder) -> Self {
        Self { pending: Some(order), ..Self::default() }
    }

    pub fn with_customer(customer_id: &str) -> Self {
        Self { customer: Some(CustomerId(customer_id.to_string())), ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail_lookups: true, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<CommerceCall> {
        self.calls.lock().expect("commerce calls lock").clone()
    }

    pub fn mutations(&self) -> Vec<CommerceCall> {
        self.calls().into_iter().filter(CommerceCall::is_mutation).collect()
    }

    fn push(&self, call: CommerceCall) {
        self.calls.lock().expect("commerce calls lock").push(call);
    }
}

#[async_trait]
impl CommerceClient for RecordingCommerce {
    async fn find_pending_order(
        &self,
        phone: &str,
        tag: &str,
    ) -> Result<Option<PendingOrder>, CommerceError> {
        self.push(CommerceCall::FindPendingOrder {
            phone: phone.to_string(),
            tag: tag.to_string(),
        });
        if self.fail_lookups {
            return Err(CommerceError::GraphQl("[{\"message\":\"Throttled\"}]".to_string()));
        }
        Ok(self.pending.clone())
    }

    async fn find_customer_id(&self, phone: &str) -> Result<Option<CustomerId>, CommerceError> {
        self.push(CommerceCall::FindCustomer { phone: phone.to_string() });
        Ok(self.customer.clone())
    }

    async fn add_tags(&self, resource_id: &str, tags: &[String]) -> Result<(), CommerceError> {
        self.push(CommerceCall::AddTags {
            resource_id: resource_id.to_string(),
            tags: tags.to_vec(),
        });
        Ok(())
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), CommerceError> {
        self.push(CommerceCall::CancelOrder { order_id: order_id.0.clone() });
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentMessage {
    Text { phone: String, message: String },
    Template { phone: String, params: Vec<String> },
}

#[derive(Default)]
pub struct RecordingGateway {
    fail: bool,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("gateway lock").clone()
    }

    fn outcome(&self) -> Result<GatewayResponse, GatewayError> {
        if self.fail {
            return Err(GatewayError::Status { status: 401, body: "Authentication Failed".into() });
        }
        Ok(GatewayResponse(json!({ "status": "submitted", "messageId": "msg-1" })))
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(&self, phone: &str, message: &str) -> Result<GatewayResponse, GatewayError> {
        self.sent.lock().expect("gateway lock").push(SentMessage::Text {
            phone: phone.to_string(),
            message: message.to_string(),
        });
        self.outcome()
    }

    async fn send_template(
        &self,
        phone: &str,
        params: &[String],
    ) -> Result<GatewayResponse, GatewayError> {
        self.sent.lock().expect("gateway lock").push(SentMessage::Template {
            phone: phone.to_string(),
            params: params.to_vec(),
        });
        self.outcome()
    }
}

pub struct ScriptedLlm {
    reply: Option<String>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: Some(reply.to_string()) })
    }

    pub fn silent() -> Arc<Self> {
        Arc::new(Self { reply: None })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _prompt: &str) -> Result<Option<String>, LlmError> {
        Ok(self.reply.clone())
    }
}
