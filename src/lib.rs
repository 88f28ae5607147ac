pub mod catalog;
pub mod core;
pub mod db;
pub mod sidecar;
pub mod storage;
pub mod sync;
pub mod worker;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{filter::Directive, EnvFilter};

use crate::{
    core::{config::WorkerConfig, errors::AppResult},
    db::Database,
    sidecar::layout_reader::{DocumentExtractor, JsonLayoutExtractor},
    storage::{FsObjectStore, ObjectStore},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: Arc<dyn ObjectStore>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub config: WorkerConfig,
}

impl AppState {
    pub async fn open(config: WorkerConfig) -> AppResult<Self> {
        let db = Database::new(&config.database_dir()).await?;
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(config.object_store_root()));
        Ok(Self {
            db,
            store,
            extractor: Arc::new(JsonLayoutExtractor),
            config,
        })
    }
}

fn env_filter(config: &WorkerConfig) -> EnvFilter {
    let filter = EnvFilter::new(&config.log_level);
    if config.sqlx_debug {
        filter
    } else {
        match "sqlx::query=warn".parse::<Directive>() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    }
}

pub fn init_tracing(config: &WorkerConfig) {
    // A subscriber may already be installed by an embedding process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .try_init();
}

pub async fn run() -> AppResult<()> {
    let config = WorkerConfig::from_env();
    init_tracing(&config);
    info!(data_dir = %config.data_dir.display(), run_once = config.run_once, "starting catalog sync worker");

    let state = AppState::open(config).await?;
    if state.config.run_once {
        while worker::run_once(&state).await? {}
        state.db.close().await;
        return Ok(());
    }
    worker::run_forever(&state).await;
    Ok(())
}
