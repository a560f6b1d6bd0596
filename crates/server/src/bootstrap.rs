use std::sync::Arc;

use axum::Router;
use codbot_agent::{GeminiClient, GenerativeResponder, LlmClient, LlmError, PromptBuilder};
use codbot_core::config::AppConfig;
use codbot_core::PhoneNormalizer;
use codbot_db::repositories::SqlConversationRepository;
use codbot_db::{connect_with_settings, migrations, DbPool};
use codbot_messaging::{GupshupClient, MessagingGateway};
use thiserror::Error;
use tracing::info;

use crate::chat::{self, InboundDispatcher};
use crate::commerce::{CommerceClient, ShopifyClient};
use crate::conversation_log::ConversationLogger;
use crate::health;
use crate::orders::{self, OrderNotifier};
use crate::outbound::{self, OutboundState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Router,
}

/// Remote collaborators shared by every handler.
pub struct Integrations {
    pub commerce: Arc<dyn CommerceClient>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub llm: Arc<dyn LlmClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("assistant prompt setup failed: {0}")]
    Prompt(#[source] LlmError),
}

impl Integrations {
    pub fn from_config(config: &AppConfig) -> Result<Self, BootstrapError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("codbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BootstrapError::HttpClient)?;

        Ok(Self {
            commerce: Arc::new(ShopifyClient::new(client.clone(), &config.commerce)),
            gateway: Arc::new(GupshupClient::new(client.clone(), &config.messaging)),
            llm: Arc::new(GeminiClient::new(client, &config.llm)),
        })
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let integrations = Integrations::from_config(&config)?;
    let router = build_router(&config, db_pool.clone(), integrations)?;

    Ok(Application { config, db_pool, router })
}

pub fn build_router(
    config: &AppConfig,
    db_pool: DbPool,
    integrations: Integrations,
) -> Result<Router, BootstrapError> {
    let logger = ConversationLogger::new(Arc::new(SqlConversationRepository::new(db_pool.clone())));
    let prompts = PromptBuilder::new().map_err(BootstrapError::Prompt)?;
    let responder =
        GenerativeResponder::new(integrations.llm, prompts, config.knowledge_base.clone());

    let dispatcher = InboundDispatcher::new(
        integrations.commerce.clone(),
        integrations.gateway.clone(),
        Arc::new(responder),
        logger.clone(),
        config.workflow.clone(),
        config.payment.clone(),
    );
    let notifier = OrderNotifier::new(
        integrations.commerce,
        integrations.gateway.clone(),
        logger.clone(),
        config.workflow.clone(),
        PhoneNormalizer::new(config.messaging.country_code.clone()),
        config.commerce.webhook_secret.clone(),
    );

    Ok(Router::new()
        .merge(chat::router(Arc::new(dispatcher)))
        .merge(orders::router(Arc::new(notifier)))
        .merge(outbound::router(OutboundState::new(integrations.gateway, logger)))
        .merge(health::router(db_pool)))
}
