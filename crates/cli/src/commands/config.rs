use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use codbot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct ConfigField {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

fn field(key: &'static str, env_key: &'static str, value: impl Into<String>) -> ConfigField {
    ConfigField { key, env_key, value: value.into() }
}

fn secret(key: &'static str, env_key: &'static str, value: &SecretString) -> ConfigField {
    field(key, env_key, redact_token(value.expose_secret()))
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in effective_fields(&config) {
        let source = field_source(
            entry.key,
            Some(entry.env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        field("database.url", "CODBOT_DATABASE_URL", config.database.url.as_str()),
        field(
            "database.max_connections",
            "CODBOT_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            "CODBOT_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        field(
            "server.bind_address",
            "CODBOT_SERVER_BIND_ADDRESS",
            config.server.bind_address.as_str(),
        ),
        field("server.port", "CODBOT_SERVER_PORT", config.server.port.to_string()),
        field(
            "messaging.base_url",
            "CODBOT_MESSAGING_BASE_URL",
            config.messaging.base_url.as_str(),
        ),
        secret("messaging.api_key", "CODBOT_MESSAGING_API_KEY", &config.messaging.api_key),
        field(
            "messaging.source_number",
            "CODBOT_MESSAGING_SOURCE_NUMBER",
            config.messaging.source_number.as_str(),
        ),
        field(
            "messaging.app_name",
            "CODBOT_MESSAGING_APP_NAME",
            config.messaging.app_name.as_str(),
        ),
        field(
            "messaging.order_template_id",
            "CODBOT_MESSAGING_ORDER_TEMPLATE_ID",
            config.messaging.order_template_id.as_str(),
        ),
        field(
            "messaging.country_code",
            "CODBOT_MESSAGING_COUNTRY_CODE",
            config.messaging.country_code.as_str(),
        ),
        field(
            "commerce.store_domain",
            "CODBOT_COMMERCE_STORE_DOMAIN",
            config.commerce.store_domain.as_str(),
        ),
        secret(
            "commerce.access_token",
            "CODBOT_COMMERCE_ACCESS_TOKEN",
            &config.commerce.access_token,
        ),
        field(
            "commerce.api_version",
            "CODBOT_COMMERCE_API_VERSION",
            config.commerce.api_version.as_str(),
        ),
        secret(
            "commerce.webhook_secret",
            "CODBOT_COMMERCE_WEBHOOK_SECRET",
            &config.commerce.webhook_secret,
        ),
        field("llm.base_url", "CODBOT_LLM_BASE_URL", config.llm.base_url.as_str()),
        secret("llm.api_key", "CODBOT_LLM_API_KEY", &config.llm.api_key),
        field("llm.model", "CODBOT_LLM_MODEL", config.llm.model.as_str()),
        field(
            "workflow.advance_percent",
            "CODBOT_WORKFLOW_ADVANCE_PERCENT",
            config.workflow.advance_percent.to_string(),
        ),
        field("workflow.currency", "CODBOT_WORKFLOW_CURRENCY", config.workflow.currency.as_str()),
        field("payment.bank_name", "CODBOT_PAYMENT_BANK_NAME", config.payment.bank_name.as_str()),
        field("logging.level", "CODBOT_LOGGING_LEVEL", config.logging.level.as_str()),
        field("logging.format", "CODBOT_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("codbot.toml"), PathBuf::from("config/codbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognizable vendor prefix such as `shpat_` and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once(['_', '-']) {
        return format!("{prefix}_***");
    }

    "<redacted>".to_string()
}
