//! Signed synthetic order-created delivery for exercising a running service.

use anyhow::Context;
use codbot_core::config::{AppConfig, LoadOptions, ServerConfig};
use codbot_core::signature;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::commands::CommandResult;

pub const DEFAULT_PHONE: &str = "923367136436";
pub const DEFAULT_TOTAL: &str = "7500.00";
pub const WEBHOOK_PATH: &str = "/api/shopify-webhook";
pub const SIGNATURE_HEADER: &str = "X-Shopify-Hmac-Sha256";
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const ORDER_CREATED_TOPIC: &str = "orders/create";

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub target: Option<String>,
    pub phone: String,
    pub total: String,
}

#[derive(Debug)]
struct Delivery {
    status: u16,
    body: String,
}

pub fn synthetic_order(phone: &str, total: &str) -> Value {
    json!({
        "id": 1234567890123u64,
        "name": "#TEST-9999",
        "gateway": "Cash on Delivery",
        "total_price": total,
        "customer": {
            "first_name": "Test",
            "last_name": "Order",
            "phone": phone
        },
        "line_items": [{ "name": "Simulated Test Product - Ring" }],
        "shipping_address": {
            "address1": "456 Test Avenue",
            "city": "Testville",
            "phone": phone
        }
    })
}

/// Wildcard bind addresses are replaced with loopback.
pub fn default_target(server: &ServerConfig) -> String {
    let host = match server.bind_address.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{host}:{}{WEBHOOK_PATH}", server.port)
}

pub fn run(args: ReplayArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let target = args.target.clone().unwrap_or_else(|| default_target(&config.server));
    let body = match serde_json::to_vec(&synthetic_order(&args.phone, &args.total)) {
        Ok(body) => body,
        Err(error) => {
            return CommandResult::failure("replay", "serialization", error.to_string(), 4);
        }
    };
    let signature =
        match signature::sign(config.commerce.webhook_secret.expose_secret().as_bytes(), &body) {
            Ok(signature) => signature,
            Err(error) => {
                return CommandResult::failure("replay", "signing", error.to_string(), 4);
            }
        };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let delivery = match runtime.block_on(deliver(&target, body, &signature)) {
        Ok(delivery) => delivery,
        Err(error) => {
            return CommandResult::failure("replay", "delivery", format!("{error:#}"), 6);
        }
    };

    if !(200..300).contains(&delivery.status) {
        return CommandResult::failure(
            "replay",
            "rejected",
            format!("webhook returned {}: {}", delivery.status, delivery.body),
            7,
        );
    }

    CommandResult::success_with_detail(
        "replay",
        format!("order-created webhook delivered to {target}"),
        json!({
            "target": target,
            "status": delivery.status,
            "response": delivery.body,
            "signature": signature,
        }),
    )
}

async fn deliver(target: &str, body: Vec<u8>, signature: &str) -> anyhow::Result<Delivery> {
    let response = reqwest::Client::new()
        .post(target)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TOPIC_HEADER, ORDER_CREATED_TOPIC)
        .body(body)
        .send()
        .await
        .with_context(|| format!("failed to reach {target}"))?;

    let status = response.status().as_u16();
    let body = response.text().await.context("failed to read webhook response")?;
    Ok(Delivery { status, body })
}
