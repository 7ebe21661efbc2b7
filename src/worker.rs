use crate::capability::completion::CompletionCapability;
use crate::capability::store::StoreCapability;
use crate::db;
use crate::nice_display::NiceDisplay;
use crate::object_storage::{self, ObjectStorage};
use crate::open_ai::OpenAi;
use crate::open_ai_key::OpenAiKey;
use crate::store::memory::MemStore;
use crate::store::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::env::VarError;
use std::sync::Arc;
use std::time::Duration;

// External calls must not hang a request forever; a timed-out generation is
// recovered the same way as any other transport failure.
const EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a request handler needs, wired once at startup. The store and
/// completion adapters are injected as capabilities so tests can swap them
/// without any global state.
#[derive(Clone)]
pub struct Worker {
    pub completion: Arc<dyn CompletionCapability>,
    pub store: Arc<dyn StoreCapability>,
    pub object_storage: Arc<ObjectStorage>,
}

pub enum InitError {
    OpenAiKey(VarError),
    HttpClient(reqwest::Error),
    DbConfig(db::ConfigError),
    PoolConnection(sqlx::Error),
    PoolAcquire(sqlx::Error),
    ObjectStorageConfig(object_storage::ConfigError),
    UnknownStoreBackend(String),
}

impl NiceDisplay for InitError {
    fn message(&self) -> String {
        match self {
            InitError::OpenAiKey(err) => format!("OpenAI API key error: {}", err),
            InitError::HttpClient(err) => format!("Error building the http client: {}", err),
            InitError::DbConfig(err) => {
                format!("Database configuration error\n{}", err.message())
            }
            InitError::PoolConnection(err) => {
                format!("Error connecting to the database pool\n{}", err)
            }
            InitError::PoolAcquire(err) => {
                format!(
                    "Error acquiring a database connection from the pool\n{}",
                    err
                )
            }
            InitError::ObjectStorageConfig(err) => {
                format!("Object storage configuration error\n{}", err.message())
            }
            InitError::UnknownStoreBackend(backend) => {
                format!(
                    "Unknown STORE_BACKEND '{}', expected 'postgres' or 'memory'",
                    backend
                )
            }
        }
    }
}

impl Worker {
    pub async fn new() -> Result<Self, InitError> {
        let open_ai_key = OpenAiKey::from_env().map_err(InitError::OpenAiKey)?;

        let reqwest_client = reqwest::Client::builder()
            .timeout(EXTERNAL_CALL_TIMEOUT)
            .build()
            .map_err(InitError::HttpClient)?;

        let backend = dotenv::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".to_string());

        let store: Arc<dyn StoreCapability> = match backend.as_str() {
            "memory" => Arc::new(MemStore::new()),
            "postgres" => {
                let db_info = db::Config::load().await.map_err(InitError::DbConfig)?;

                let sqlx_pool = {
                    let postgres_conn_url = format!(
                        "postgres://{}:{}@{}/{}",
                        db_info.user, db_info.password, db_info.host, db_info.db_name
                    );

                    PgPoolOptions::new()
                        .min_connections(2)
                        .idle_timeout(Duration::from_secs(600))
                        .max_connections(19)
                        .test_before_acquire(true)
                        .connect(&postgres_conn_url)
                        .await
                        .map_err(InitError::PoolConnection)?
                };

                sqlx::query("SELECT 1")
                    .execute(&sqlx_pool)
                    .await
                    .map_err(InitError::PoolAcquire)?;

                Arc::new(PgStore::new(sqlx_pool))
            }
            other => return Err(InitError::UnknownStoreBackend(other.to_string())),
        };

        let object_storage_config =
            object_storage::Config::load().map_err(InitError::ObjectStorageConfig)?;

        Ok(Worker {
            completion: Arc::new(OpenAi::new(open_ai_key, reqwest_client.clone())),
            store,
            object_storage: Arc::new(ObjectStorage::new(object_storage_config, reqwest_client)),
        })
    }
}
