//! Shared application state for the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use hearth_core::relay::session::{ChatRelay, RelayConfig};
use hearth_infra::llm::ollama::OllamaClient;
use hearth_infra::sqlite::conversation::SqliteConversationStore;
use hearth_infra::sqlite::pool::{DatabasePool, database_url};
use hearth_types::config::HearthConfig;

/// Relay over the concrete store and upstream used in production.
pub type Relay = ChatRelay<SqliteConversationStore, OllamaClient>;

/// Cloned into every handler; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub store: Arc<SqliteConversationStore>,
    pub config: Arc<HearthConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database under `data_dir` and wire the relay.
    pub async fn init(data_dir: PathBuf, config: HearthConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let url = database_url(&data_dir, &config.storage.database_file);
        let pool = DatabasePool::new(&url).await?;
        tracing::info!(path = %data_dir.display(), "database opened");

        Self::from_pool(pool, config, data_dir)
    }

    pub fn from_pool(
        pool: DatabasePool,
        config: HearthConfig,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(SqliteConversationStore::new(pool));
        let upstream = Arc::new(OllamaClient::from_config(&config.upstream)?);

        let relay_config = RelayConfig {
            default_model: config.upstream.default_model.clone(),
            options: config.upstream.options.clone(),
            ..RelayConfig::default()
        };
        let relay = Arc::new(ChatRelay::new(store.clone(), upstream, relay_config));

        Ok(Self {
            relay,
            store,
            config: Arc::new(config),
            data_dir,
        })
    }
}
