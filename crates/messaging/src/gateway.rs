use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use codbot_core::config::MessagingConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Gateway reply body: parsed JSON when possible, otherwise the raw text.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayResponse(pub Value);

impl GatewayResponse {
    pub fn from_body(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self(value),
            Err(_) => Self(Value::String(raw.to_string())),
        }
    }
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(&self, phone: &str, message: &str) -> Result<GatewayResponse, GatewayError>;

    async fn send_template(
        &self,
        phone: &str,
        params: &[String],
    ) -> Result<GatewayResponse, GatewayError>;
}

#[derive(Clone)]
pub struct GupshupClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    channel: String,
    source_number: String,
    app_name: String,
    template_id: String,
}

impl GupshupClient {
    pub fn new(client: Client, config: &MessagingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            channel: config.channel.clone(),
            source_number: config.source_number.clone(),
            app_name: config.app_name.clone(),
            template_id: config.order_template_id.clone(),
        }
    }

    fn text_form(&self, phone: &str, message: &str) -> Vec<(&'static str, String)> {
        vec![
            ("channel", self.channel.clone()),
            ("source", self.source_number.clone()),
            ("destination", phone.to_string()),
            ("message", message.to_string()),
            ("src.name", self.app_name.clone()),
        ]
    }

    fn template_form(&self, phone: &str, params: &[String]) -> Vec<(&'static str, String)> {
        let template = json!({ "id": self.template_id, "params": params });
        vec![
            ("channel", self.channel.clone()),
            ("source", self.source_number.clone()),
            ("destination", phone.to_string()),
            ("template", template.to_string()),
            ("src.name", self.app_name.clone()),
        ]
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("apikey", self.api_key.expose_secret())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }

        debug!(path, status = status.as_u16(), "gateway accepted message");
        Ok(GatewayResponse::from_body(&body))
    }
}

#[async_trait]
impl MessagingGateway for GupshupClient {
    async fn send_text(&self, phone: &str, message: &str) -> Result<GatewayResponse, GatewayError> {
        self.post_form("/wa/api/v1/msg", &self.text_form(phone, message)).await
    }

    async fn send_template(
        &self,
        phone: &str,
        params: &[String],
    ) -> Result<GatewayResponse, GatewayError> {
        self.post_form("/wa/api/v1/template/msg", &self.template_form(phone, params)).await
    }
}

#[cfg(test)]
mod tests {
    use codbot_core::config::AppConfig;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use reqwest::Client;
    use serde_json::{json, Value};

    use super::{GatewayError, GatewayResponse, GupshupClient, MessagingGateway};

    fn client() -> GupshupClient {
        let mut config = AppConfig::default().messaging;
        config.base_url = "https://api.gupshup.io/".to_string();
        config.source_number = "917834811114".to_string();
        config.app_name = "ringshing".to_string();
        config.order_template_id = "tmpl-cod-1".to_string();
        GupshupClient::new(Client::new(), &config)
    }

    #[test]
    fn text_form_carries_gateway_fields() {
        let form = client().text_form("923001234567", "hello");

        assert_eq!(
            form,
            vec![
                ("channel", "whatsapp".to_string()),
                ("source", "917834811114".to_string()),
                ("destination", "923001234567".to_string()),
                ("message", "hello".to_string()),
                ("src.name", "ringshing".to_string()),
            ]
        );
    }

    #[test]
    fn template_form_embeds_template_json() {
        let params = vec!["Test".to_string(), "#1001".to_string()];
        let form = client().template_form("923001234567", &params);

        let template = form
            .iter()
            .find(|(key, _)| *key == "template")
            .map(|(_, value)| value.clone())
            .expect("template field");
        let parsed: Value = serde_json::from_str(&template).expect("template json");

        assert_eq!(parsed, json!({ "id": "tmpl-cod-1", "params": ["Test", "#1001"] }));
        assert!(form.iter().all(|(key, _)| *key != "message"));
    }

    fn client_for(server: &MockServer) -> GupshupClient {
        let mut config = AppConfig::default().messaging;
        config.base_url = server.base_url();
        config.api_key = "gs-key-test".to_string().into();
        config.source_number = "917834811114".to_string();
        config.app_name = "ringshing".to_string();
        config.order_template_id = "tmpl-cod-1".to_string();
        GupshupClient::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn send_text_posts_form_with_api_key_header() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST)
                .path("/wa/api/v1/msg")
                .header("apikey", "gs-key-test")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(
                    "channel=whatsapp&source=917834811114&destination=923001234567\
                     &message=hello&src.name=ringshing",
                );
            then.status(202)
                .header("content-type", "application/json")
                .body(r#"{"status":"submitted","messageId":"m-1"}"#);
        });

        let response = client_for(&server)
            .send_text("923001234567", "hello")
            .await
            .expect("send text");

        sent.assert_calls(1);
        assert_eq!(response.0, json!({ "status": "submitted", "messageId": "m-1" }));
    }

    #[tokio::test]
    async fn send_template_targets_template_endpoint() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST).path("/wa/api/v1/template/msg").header("apikey", "gs-key-test");
            then.status(200).body("accepted");
        });

        let params = vec!["Test".to_string(), "#1001".to_string()];
        let response = client_for(&server)
            .send_template("923001234567", &params)
            .await
            .expect("send template");

        sent.assert_calls(1);
        assert_eq!(response.0, Value::String("accepted".to_string()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let server = MockServer::start();
        let rejected = server.mock(|when, then| {
            when.method(POST).path("/wa/api/v1/msg");
            then.status(401).body("Authentication Failed");
        });

        let error = client_for(&server)
            .send_text("923001234567", "hello")
            .await
            .expect_err("401 should fail");

        rejected.assert_calls(1);
        match error {
            GatewayError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "Authentication Failed");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(client().base_url, "https://api.gupshup.io");
    }

    #[test]
    fn response_body_falls_back_to_raw_text() {
        assert_eq!(
            GatewayResponse::from_body(r#"{"status":"submitted","messageId":"m-1"}"#).0,
            json!({ "status": "submitted", "messageId": "m-1" })
        );
        assert_eq!(
            GatewayResponse::from_body("Authentication Failed").0,
            Value::String("Authentication Failed".to_string())
        );
    }
}
