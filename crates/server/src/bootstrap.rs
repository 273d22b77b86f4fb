use std::sync::Arc;

use tendero_agent::{HttpLlmClient, IntentClassifier};
use tendero_chat::ActionExecutor;
use tendero_core::config::{AppConfig, ConfigError, LoadOptions};
use tendero_db::repositories::{
    SqlConversationRepository, SqlProductRepository, SqlSaleRepository,
};
use tendero_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::chat::ChatState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub chat_state: ChatState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client initialization failed: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        conversation_id = "unknown",
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
        conversation_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        conversation_id = "unknown",
        "database migrations applied"
    );

    let llm_client =
        HttpLlmClient::from_config(&config.llm).map_err(|error| BootstrapError::Llm(error.to_string()))?;
    let classifier = Arc::new(IntentClassifier::new(Arc::new(llm_client)));

    let products = Arc::new(SqlProductRepository::new(db_pool.clone()));
    let sales = Arc::new(SqlSaleRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let executor = Arc::new(ActionExecutor::new(products, sales, config.matcher.fuzzy_threshold));

    let chat_state = ChatState::new(classifier, executor, conversations);

    Ok(Application { config, db_pool, chat_state })
}
