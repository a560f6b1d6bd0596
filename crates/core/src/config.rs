use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::KnowledgeBase;
use crate::phone::DEFAULT_COUNTRY_CODE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub messaging: MessagingConfig,
    pub commerce: CommerceConfig,
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
    pub payment: PaymentConfig,
    pub knowledge_base: KnowledgeBase,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub source_number: String,
    pub app_name: String,
    pub channel: String,
    pub order_template_id: String,
    pub country_code: String,
}

#[derive(Clone, Debug)]
pub struct CommerceConfig {
    pub store_domain: String,
    pub access_token: SecretString,
    pub api_version: String,
    pub webhook_secret: SecretString,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub deferred_payment_keyword: String,
    pub advance_percent: Decimal,
    pub currency: String,
    pub awaiting_confirmation_tag: String,
    pub confirmed_tag: String,
    pub human_assistance_tag: String,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub bank_name: String,
    pub account_title: String,
    pub account_number: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub messaging_base_url: Option<String>,
    pub messaging_api_key: Option<String>,
    pub messaging_source_number: Option<String>,
    pub messaging_app_name: Option<String>,
    pub messaging_order_template_id: Option<String>,
    pub commerce_store_domain: Option<String>,
    pub commerce_access_token: Option<String>,
    pub commerce_webhook_secret: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://codbot.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            messaging: MessagingConfig {
                base_url: "https://api.gupshup.io".to_string(),
                api_key: String::new().into(),
                source_number: String::new(),
                app_name: String::new(),
                channel: "whatsapp".to_string(),
                order_template_id: String::new(),
                country_code: DEFAULT_COUNTRY_CODE.to_string(),
            },
            commerce: CommerceConfig {
                store_domain: String::new(),
                access_token: String::new().into(),
                api_version: "2024-07".to_string(),
                webhook_secret: String::new().into(),
            },
            llm: LlmConfig {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                api_key: String::new().into(),
                model: "gemini-1.5-flash-latest".to_string(),
            },
            workflow: WorkflowConfig {
                deferred_payment_keyword: "bank deposit".to_string(),
                advance_percent: Decimal::ONE,
                currency: "PKR".to_string(),
                awaiting_confirmation_tag: "COD-Confirmation-Sent".to_string(),
                confirmed_tag: "COD-Confirmed".to_string(),
                human_assistance_tag: "human-assistance-required".to_string(),
            },
            payment: PaymentConfig {
                bank_name: "[Your Bank Name]".to_string(),
                account_title: "[Your Account Title]".to_string(),
                account_number: "[Your Account Number]".to_string(),
            },
            knowledge_base: KnowledgeBase::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("codbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(messaging) = patch.messaging {
            if let Some(base_url) = messaging.base_url {
                self.messaging.base_url = base_url;
            }
            if let Some(messaging_api_key_value) = messaging.api_key {
                self.messaging.api_key = secret_value(messaging_api_key_value);
            }
            if let Some(source_number) = messaging.source_number {
                self.messaging.source_number = source_number;
            }
            if let Some(app_name) = messaging.app_name {
                self.messaging.app_name = app_name;
            }
            if let Some(channel) = messaging.channel {
                self.messaging.channel = channel;
            }
            if let Some(order_template_id) = messaging.order_template_id {
                self.messaging.order_template_id = order_template_id;
            }
            if let Some(country_code) = messaging.country_code {
                self.messaging.country_code = country_code;
            }
        }

        if let Some(commerce) = patch.commerce {
            if let Some(store_domain) = commerce.store_domain {
                self.commerce.store_domain = store_domain;
            }
            if let Some(commerce_access_token_value) = commerce.access_token {
                self.commerce.access_token = secret_value(commerce_access_token_value);
            }
            if let Some(api_version) = commerce.api_version {
                self.commerce.api_version = api_version;
            }
            if let Some(commerce_webhook_secret_value) = commerce.webhook_secret {
                self.commerce.webhook_secret = secret_value(commerce_webhook_secret_value);
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(keyword) = workflow.deferred_payment_keyword {
                self.workflow.deferred_payment_keyword = keyword;
            }
            if let Some(advance_percent) = workflow.advance_percent {
                self.workflow.advance_percent = advance_percent;
            }
            if let Some(currency) = workflow.currency {
                self.workflow.currency = currency;
            }
            if let Some(tag) = workflow.awaiting_confirmation_tag {
                self.workflow.awaiting_confirmation_tag = tag;
            }
            if let Some(tag) = workflow.confirmed_tag {
                self.workflow.confirmed_tag = tag;
            }
            if let Some(tag) = workflow.human_assistance_tag {
                self.workflow.human_assistance_tag = tag;
            }
        }

        if let Some(payment) = patch.payment {
            if let Some(bank_name) = payment.bank_name {
                self.payment.bank_name = bank_name;
            }
            if let Some(account_title) = payment.account_title {
                self.payment.account_title = account_title;
            }
            if let Some(account_number) = payment.account_number {
                self.payment.account_number = account_number;
            }
        }

        if let Some(knowledge_base) = patch.knowledge_base {
            self.knowledge_base = knowledge_base;
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CODBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CODBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CODBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CODBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CODBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CODBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CODBOT_SERVER_PORT") {
            self.server.port = parse_u16("CODBOT_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("CODBOT_MESSAGING_BASE_URL") {
            self.messaging.base_url = value;
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_API_KEY") {
            self.messaging.api_key = secret_value(value);
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_SOURCE_NUMBER") {
            self.messaging.source_number = value;
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_APP_NAME") {
            self.messaging.app_name = value;
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_CHANNEL") {
            self.messaging.channel = value;
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_ORDER_TEMPLATE_ID") {
            self.messaging.order_template_id = value;
        }
        if let Some(value) = read_env("CODBOT_MESSAGING_COUNTRY_CODE") {
            self.messaging.country_code = value;
        }

        if let Some(value) = read_env("CODBOT_COMMERCE_STORE_DOMAIN") {
            self.commerce.store_domain = value;
        }
        if let Some(value) = read_env("CODBOT_COMMERCE_ACCESS_TOKEN") {
            self.commerce.access_token = secret_value(value);
        }
        if let Some(value) = read_env("CODBOT_COMMERCE_API_VERSION") {
            self.commerce.api_version = value;
        }
        if let Some(value) = read_env("CODBOT_COMMERCE_WEBHOOK_SECRET") {
            self.commerce.webhook_secret = secret_value(value);
        }

        if let Some(value) = read_env("CODBOT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CODBOT_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("CODBOT_LLM_MODEL") {
            self.llm.model = value;
        }

        if let Some(value) = read_env("CODBOT_WORKFLOW_DEFERRED_PAYMENT_KEYWORD") {
            self.workflow.deferred_payment_keyword = value;
        }
        if let Some(value) = read_env("CODBOT_WORKFLOW_ADVANCE_PERCENT") {
            self.workflow.advance_percent =
                parse_decimal("CODBOT_WORKFLOW_ADVANCE_PERCENT", &value)?;
        }
        if let Some(value) = read_env("CODBOT_WORKFLOW_CURRENCY") {
            self.workflow.currency = value;
        }

        if let Some(value) = read_env("CODBOT_PAYMENT_BANK_NAME") {
            self.payment.bank_name = value;
        }
        if let Some(value) = read_env("CODBOT_PAYMENT_ACCOUNT_TITLE") {
            self.payment.account_title = value;
        }
        if let Some(value) = read_env("CODBOT_PAYMENT_ACCOUNT_NUMBER") {
            self.payment.account_number = value;
        }

        let log_level = read_env("CODBOT_LOGGING_LEVEL").or_else(|| read_env("CODBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CODBOT_LOGGING_FORMAT").or_else(|| read_env("CODBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(base_url) = overrides.messaging_base_url {
            self.messaging.base_url = base_url;
        }
        if let Some(api_key) = overrides.messaging_api_key {
            self.messaging.api_key = secret_value(api_key);
        }
        if let Some(source_number) = overrides.messaging_source_number {
            self.messaging.source_number = source_number;
        }
        if let Some(app_name) = overrides.messaging_app_name {
            self.messaging.app_name = app_name;
        }
        if let Some(template_id) = overrides.messaging_order_template_id {
            self.messaging.order_template_id = template_id;
        }
        if let Some(store_domain) = overrides.commerce_store_domain {
            self.commerce.store_domain = store_domain;
        }
        if let Some(access_token) = overrides.commerce_access_token {
            self.commerce.access_token = secret_value(access_token);
        }
        if let Some(webhook_secret) = overrides.commerce_webhook_secret {
            self.commerce.webhook_secret = secret_value(webhook_secret);
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(api_key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_messaging(&self.messaging)?;
        validate_commerce(&self.commerce)?;
        validate_llm(&self.llm)?;
        validate_workflow(&self.workflow)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("codbot.toml"), PathBuf::from("config/codbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_messaging(messaging: &MessagingConfig) -> Result<(), ConfigError> {
    require_http_url("messaging.base_url", &messaging.base_url)?;

    if messaging.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "messaging.api_key is required. Copy it from the Gupshup dashboard > Profile > API Key"
                .to_string(),
        ));
    }
    require_present("messaging.source_number", &messaging.source_number)?;
    require_present("messaging.app_name", &messaging.app_name)?;
    require_present("messaging.order_template_id", &messaging.order_template_id)?;

    if messaging.country_code.is_empty()
        || !messaging.country_code.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(ConfigError::Validation(
            "messaging.country_code must be a non-empty string of digits (e.g. `92`)".to_string(),
        ));
    }

    Ok(())
}

fn validate_commerce(commerce: &CommerceConfig) -> Result<(), ConfigError> {
    let domain = commerce.store_domain.trim();
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "commerce.store_domain is required (e.g. `my-store.myshopify.com`)".to_string(),
        ));
    }
    if domain.contains("://") || domain.contains('/') {
        return Err(ConfigError::Validation(
            "commerce.store_domain must be a bare host name without scheme or path".to_string(),
        ));
    }

    if commerce.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "commerce.access_token is required (Admin API access token)".to_string(),
        ));
    }
    if commerce.webhook_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "commerce.webhook_secret is required to verify order webhooks".to_string(),
        ));
    }
    require_present("commerce.api_version", &commerce.api_version)?;

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    require_http_url("llm.base_url", &llm.base_url)?;
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_key is required".to_string()));
    }
    require_present("llm.model", &llm.model)
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if workflow.advance_percent.is_sign_negative()
        || workflow.advance_percent > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::Validation(
            "workflow.advance_percent must be in range 0..=100".to_string(),
        ));
    }
    require_present("workflow.currency", &workflow.currency)?;
    require_present("workflow.awaiting_confirmation_tag", &workflow.awaiting_confirmation_tag)?;
    require_present("workflow.confirmed_tag", &workflow.confirmed_tag)?;
    require_present("workflow.human_assistance_tag", &workflow.human_assistance_tag)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn require_present(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} is required")));
    }
    Ok(())
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    messaging: Option<MessagingPatch>,
    commerce: Option<CommercePatch>,
    llm: Option<LlmPatch>,
    workflow: Option<WorkflowPatch>,
    payment: Option<PaymentPatch>,
    knowledge_base: Option<KnowledgeBase>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    source_number: Option<String>,
    app_name: Option<String>,
    channel: Option<String>,
    order_template_id: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CommercePatch {
    store_domain: Option<String>,
    access_token: Option<String>,
    api_version: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    deferred_payment_keyword: Option<String>,
    advance_percent: Option<Decimal>,
    currency: Option<String>,
    awaiting_confirmation_tag: Option<String>,
    confirmed_tag: Option<String>,
    human_assistance_tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentPatch {
    bank_name: Option<String>,
    account_title: Option<String>,
    account_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const REQUIRED_VARS: &[(&str, &str)] = &[
        ("CODBOT_MESSAGING_API_KEY", "gs-key-from-env"),
        ("CODBOT_MESSAGING_SOURCE_NUMBER", "917834811114"),
        ("CODBOT_MESSAGING_APP_NAME", "ringshing"),
        ("CODBOT_MESSAGING_ORDER_TEMPLATE_ID", "tmpl-cod-1"),
        ("CODBOT_COMMERCE_STORE_DOMAIN", "ringshing.myshopify.com"),
        ("CODBOT_COMMERCE_ACCESS_TOKEN", "shpat_from_env"),
        ("CODBOT_COMMERCE_WEBHOOK_SECRET", "whsec-from-env"),
        ("CODBOT_LLM_API_KEY", "gemini-from-env"),
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_required_vars() {
        for (key, value) in REQUIRED_VARS {
            env::set_var(key, value);
        }
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
        for (key, _) in REQUIRED_VARS {
            env::remove_var(key);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::remove_var("CODBOT_COMMERCE_WEBHOOK_SECRET");
        env::set_var("TEST_SHOP_WEBHOOK_SECRET", "whsec-interpolated");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("codbot.toml");
            fs::write(
                &path,
                r#"
[commerce]
webhook_secret = "${TEST_SHOP_WEBHOOK_SECRET}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.commerce.webhook_secret.expose_secret() == "whsec-interpolated",
                "webhook secret should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_SHOP_WEBHOOK_SECRET"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::set_var("CODBOT_LOG_LEVEL", "warn");
        env::set_var("CODBOT_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["CODBOT_LOG_LEVEL", "CODBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::set_var("CODBOT_DATABASE_URL", "sqlite://from-env.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("codbot.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[messaging]
api_key = "gs-key-from-file"
country_code = "44"

[workflow]
advance_percent = "2.5"
currency = "GBP"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.messaging.api_key.expose_secret() == "gs-key-from-env",
                "env api key should win over file and defaults",
            )?;
            ensure(config.messaging.country_code == "44", "file country code should apply")?;
            ensure(
                config.workflow.advance_percent == Decimal::new(25, 1),
                "file advance percent should apply",
            )?;
            ensure(config.workflow.currency == "GBP", "file currency should apply")
        })();

        clear_vars(&["CODBOT_DATABASE_URL"]);
        result
    }

    #[test]
    fn knowledge_base_can_be_replaced_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("codbot.toml");
            fs::write(
                &path,
                r#"
[knowledge_base]
store_name = "Example Jewels"
location = "Main Boulevard"
specialty = "Gold"
payment_methods = "Cash on Delivery"

[knowledge_base.gold_price_estimate]
rate_per_gram_24k = 20000
grams_for_small_ring = 3
grams_for_large_ring = 5
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.knowledge_base.store_name == "Example Jewels",
                "knowledge base should come from the file",
            )
        })();

        clear_vars(&[]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::remove_var("CODBOT_COMMERCE_WEBHOOK_SECRET");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("commerce.webhook_secret")
            );
            ensure(has_message, "validation failure should mention commerce.webhook_secret")
        })();

        clear_vars(&[]);
        result
    }

    #[test]
    fn store_domain_must_be_a_bare_host() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();
        env::set_var("CODBOT_COMMERCE_STORE_DOMAIN", "https://ringshing.myshopify.com/");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::Validation(message)) if message.contains("bare host") => Ok(()),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected store domain validation failure".to_string()),
        };

        clear_vars(&[]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_required_vars();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gs-key-from-env"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("whsec-from-env"),
                "debug output should not contain webhook secret",
            )?;
            ensure(
                !debug.contains("shpat_from_env"),
                "debug output should not contain access token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&[]);
        result
    }
}
