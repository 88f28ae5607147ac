use std::path::PathBuf;
use std::time::Duration;

use crate::db::default_data_dir;

const DEFAULT_POLL_SECONDS: u64 = 10;

/// Worker settings read from `CATALOG_SYNC_*` environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub log_level: String,
    pub sqlx_debug: bool,
    pub run_once: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".catalog-sync"),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECONDS),
            log_level: "info".to_string(),
            sqlx_debug: false,
            run_once: false,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let data_dir = std::env::var("CATALOG_SYNC_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let data_dir = default_data_dir(data_dir).unwrap_or(defaults.data_dir);

        let poll_interval = std::env::var("CATALOG_SYNC_POLL_SECONDS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        Self {
            data_dir,
            poll_interval,
            log_level: log_level_from_env(),
            sqlx_debug: flag_enabled("CATALOG_SYNC_SQLX_DEBUG"),
            run_once: flag_enabled("CATALOG_SYNC_RUN_ONCE"),
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn object_store_root(&self) -> PathBuf {
        self.data_dir.join("objects")
    }
}

fn log_level_from_env() -> String {
    match std::env::var("CATALOG_SYNC_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
    .to_string()
}

fn flag_enabled(name: &str) -> bool {
    matches!(
        std::env::var(name)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}
