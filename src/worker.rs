//! Job claiming loop. One job at a time per worker.

use tracing::{error, info};

use crate::{
    core::errors::AppResult,
    db::repositories::{catalogs, jobs},
    sync::{
        engine::{JobOutcome, SyncEngine},
        progress::LABEL_QUEUED,
    },
    AppState,
};

/// Claims and processes at most one queued job. Returns whether a job was found.
pub async fn run_once(state: &AppState) -> AppResult<bool> {
    let pool = state.db.pool();
    let Some(job) = jobs::claim_next_job(pool).await? else {
        return Ok(false);
    };
    info!(job_id = %job.id, catalog_id = %job.catalog_id, attempts = job.attempts, "claimed parser job");

    catalogs::mark_processing(
        pool,
        &job.catalog_id,
        &serde_json::json!({ "progress_percent": 0, "progress_label": LABEL_QUEUED }),
    )
    .await?;

    let engine = SyncEngine::new(state.db.clone(), state.store.clone(), state.extractor.clone());
    match engine.process_job(&job).await? {
        JobOutcome::Completed(summary) => info!(
            job_id = %job.id,
            total_items = summary.progress.total_items,
            capture_verification_passed = summary.capture_verification.capture_verification_passed,
            "parser job succeeded"
        ),
        JobOutcome::Failed(err) => info!(job_id = %job.id, code = err.code(), "parser job marked failed"),
    }
    Ok(true)
}

/// Polls for jobs until the process exits, sleeping whenever the queue is idle.
pub async fn run_forever(state: &AppState) {
    loop {
        match run_once(state).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) => error!(code = err.code(), "worker loop error: {err}"),
        }
        tokio::time::sleep(state.config.poll_interval).await;
    }
}
