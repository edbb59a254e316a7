use std::{future::Future, path::PathBuf};

use accrual_client::AccrualApi;
use log::*;
use loyalty_engine::SqliteDatabase;

use crate::{
    accrual_worker::{start_accrual_worker, WorkerSummary},
    config::ServerConfig,
    errors::ServerError,
};

/// Runs the loyalty service until Ctrl-C is pressed.
pub async fn run_service(config: ServerConfig) -> Result<WorkerSummary, ServerError> {
    run_service_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("🚀️ Could not listen for the shutdown signal. {e}");
        }
    })
    .await
}

/// Opens the database, applies migrations if so configured, and runs the accrual worker until `shutdown` resolves.
/// The worker finishes the order it is busy with before this returns.
pub async fn run_service_until<F: Future>(config: ServerConfig, shutdown: F) -> Result<WorkerSummary, ServerError> {
    let base_url = config.accrual.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ServerError::ConfigurationError(format!(
            "The accrual service address must be an http(s) URL. Got '{base_url}'"
        )));
    }
    if let Some(dir) = database_file_path(&config.database_url).and_then(|p| p.parent().map(PathBuf::from)) {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                ServerError::InitializeError(format!("Could not create the database directory {}. {e}", dir.display()))
            })?;
        }
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        info!("🪛️ Skipping database migrations");
    }
    let client = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Asking {} about unsettled orders", config.accrual.base_url);
    let worker = start_accrual_worker(db, client, config.worker);
    let summary = worker.stop_on(shutdown).await?;
    info!("🚀️ Loyalty service stopped. {summary}");
    Ok(summary)
}

/// The file behind a SQLite URL, if there is one.
fn database_file_path(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_files() {
        assert_eq!(database_file_path("sqlite://data/loyalty.db"), Some(PathBuf::from("data/loyalty.db")));
        assert_eq!(database_file_path("sqlite:///tmp/lp.db?mode=rwc"), Some(PathBuf::from("/tmp/lp.db")));
        assert_eq!(database_file_path("sqlite::memory:"), None);
        assert_eq!(database_file_path("postgres://localhost/lp"), None);
    }

    #[tokio::test]
    async fn rejects_non_http_accrual_addresses() {
        let mut config = ServerConfig::default();
        config.accrual.base_url = "localhost:8080".into();
        let err = run_service_until(config, async {}).await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(_)));
    }
}
