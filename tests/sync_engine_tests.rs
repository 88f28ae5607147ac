mod common;

use std::sync::Arc;

use catalog_sync_lib::{
    catalog::fingerprint::sha256_hex,
    core::types::{CatalogParseSummary, CatalogStatus, ChangeType, JobItemStatus, JobStatus, ParseStatus},
    db::repositories::{catalog_items, catalogs, job_items, jobs},
    sidecar::types::LayoutPayload,
    storage::{ObjectStore, DOCUMENT_BUCKET, IMAGE_BUCKET},
    worker, AppState,
};
use common::{bloom_items, catalog_layout, image_bytes_for, json_state, layout_bytes, test_state, ItemSpec};

fn full_layout() -> LayoutPayload {
    catalog_layout(&[bloom_items(100, 16), bloom_items(200, 5)])
}

async fn submit(state: &AppState, catalog_id: &str, job_id: &str, document: &[u8]) {
    let path = format!("uploads/{catalog_id}.layout.json");
    state
        .store
        .upload(DOCUMENT_BUCKET, &path, document)
        .await
        .expect("upload document");
    catalogs::create_catalog(state.db.pool(), catalog_id, &path)
        .await
        .expect("create catalog");
    jobs::enqueue_job(state.db.pool(), job_id, catalog_id)
        .await
        .expect("enqueue job");
}

async fn run_single_job(state: &AppState) {
    assert!(worker::run_once(state).await.expect("worker run"));
    assert!(!worker::run_once(state).await.expect("idle worker run"));
}

async fn parse_summary(state: &AppState, catalog_id: &str) -> CatalogParseSummary {
    let catalog = catalogs::get_catalog(state.db.pool(), catalog_id).await.expect("catalog");
    serde_json::from_value(catalog.parse_summary).expect("parse summary shape")
}

async fn publish(state: &AppState, catalog_id: &str) {
    catalog_items::approve_all_items(state.db.pool(), catalog_id)
        .await
        .expect("approve");
    catalogs::publish_catalog(state.db.pool(), catalog_id)
        .await
        .expect("publish");
}

#[tokio::test]
async fn first_run_parses_every_item_as_new() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    let document = layout_bytes(&full_layout());
    submit(&state, "cat-1", "job-1", &document).await;

    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-1").await.expect("job");
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.progress_label, "complete");
    assert_eq!(job.attempts, 1);
    assert_eq!(job.progress.raw_candidates, 21);
    assert_eq!(job.progress.total_items, 21);
    assert_eq!(job.progress.queued_items, 21);
    assert_eq!(job.progress.processed_items, 21);
    assert_eq!(job.progress.reused_items, 0);
    assert_eq!(job.progress.total_pages, 2);
    assert_eq!(job.progress.progress_percent, 100);

    let catalog = catalogs::get_catalog(state.db.pool(), "cat-1").await.expect("catalog");
    assert_eq!(catalog.parse_status, Some(ParseStatus::NeedsReview));
    assert_eq!(catalog.status, CatalogStatus::Draft);
    assert_eq!(catalog.pdf_sha256.as_deref(), Some(sha256_hex(&document).as_str()));

    let summary = parse_summary(&state, "cat-1").await;
    assert_eq!(summary.new_items, 21);
    assert_eq!(summary.unchanged_items, 0);
    assert_eq!(summary.removed_items, 0);
    assert_eq!(summary.missing_images, 0);
    assert_eq!(summary.baseline_catalog_id, None);
    assert!(summary.capture_verification.capture_verification_passed);
    assert_eq!(summary.capture_verification.expected_items_min, 17);
    assert_eq!(summary.capture_verification.expected_items_max, 32);

    let items = catalog_items::list_items(state.db.pool(), "cat-1").await.expect("items");
    assert_eq!(items.len(), 21);
    for item in &items {
        assert_eq!(item.change_type, ChangeType::New);
        assert!(!item.approved);
        assert!(item.parse_issues.is_empty());
        let prefix = format!("catalog-items/cat-1/{}-", item.sku);
        assert!(item.image_storage_path.starts_with(&prefix), "{}", item.image_storage_path);
        assert!(item.image_storage_path.ends_with(".png"));
        let stored = state
            .store
            .download(IMAGE_BUCKET, &item.image_storage_path)
            .await
            .expect("stored image");
        assert_eq!(stored, image_bytes_for(&item.sku));
    }

    let job_rows = job_items::list_job_items(state.db.pool(), "job-1").await.expect("job items");
    assert_eq!(job_rows.len(), 21);
    assert!(job_rows
        .iter()
        .all(|row| row.status == JobItemStatus::Success && row.attempts == 1));
}

#[tokio::test]
async fn requeued_catalog_reuses_cache_and_replaces_items() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    submit(&state, "cat-1", "job-1", &layout_bytes(&full_layout())).await;
    run_single_job(&state).await;
    let first_items = catalog_items::list_items(state.db.pool(), "cat-1").await.expect("items");

    jobs::enqueue_job(state.db.pool(), "job-2", "cat-1").await.expect("requeue");
    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-2").await.expect("job");
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.progress.reused_items, 21);
    assert_eq!(job.progress.processed_items, 0);
    assert_eq!(job.progress.progress_percent, 100);

    let items = catalog_items::list_items(state.db.pool(), "cat-1").await.expect("items");
    assert_eq!(items, first_items);
}

#[tokio::test]
async fn unchanged_document_against_published_baseline_is_fully_reused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    let document = layout_bytes(&full_layout());
    submit(&state, "cat-1", "job-1", &document).await;
    run_single_job(&state).await;
    publish(&state, "cat-1").await;
    let baseline_items = catalog_items::list_items(state.db.pool(), "cat-1").await.expect("items");

    submit(&state, "cat-2", "job-2", &document).await;
    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-2").await.expect("job");
    assert_eq!(job.progress.reused_items, 21);
    assert_eq!(job.progress.queued_items, 0);
    assert_eq!(job.progress.processed_items, 0);

    let summary = parse_summary(&state, "cat-2").await;
    assert_eq!(summary.unchanged_items, 21);
    assert_eq!(summary.new_items, 0);
    assert_eq!(summary.updated_items, 0);
    assert_eq!(summary.removed_items, 0);
    assert_eq!(summary.baseline_catalog_id.as_deref(), Some("cat-1"));

    let items = catalog_items::list_items(state.db.pool(), "cat-2").await.expect("items");
    assert_eq!(items.len(), baseline_items.len());
    for (item, previous) in items.iter().zip(&baseline_items) {
        assert_eq!(item.sku, previous.sku);
        assert_eq!(item.change_type, ChangeType::Unchanged);
        assert!(item.approved);
        assert_eq!(item.signature, previous.signature);
        assert_eq!(item.name, previous.name);
        assert_eq!(item.pack, previous.pack);
        assert_eq!(item.upc, previous.upc);
        assert_eq!(item.image_storage_path, previous.image_storage_path);
    }

    let job_rows = job_items::list_job_items(state.db.pool(), "job-2").await.expect("job items");
    assert!(job_rows.iter().all(|row| row.status == JobItemStatus::Reused));
}

#[tokio::test]
async fn edited_document_reports_updated_new_and_removed_items() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    submit(&state, "cat-1", "job-1", &layout_bytes(&full_layout())).await;
    run_single_job(&state).await;
    publish(&state, "cat-1").await;

    let mut first_page = bloom_items(100, 16);
    first_page[0].pack = Some("24/3oz".to_string());
    let mut last_page = bloom_items(200, 5);
    last_page[4] = ItemSpec::new("BLM299", "Sour Sticks 299", "032797000299", "12/3oz");
    submit(&state, "cat-2", "job-2", &layout_bytes(&catalog_layout(&[first_page, last_page]))).await;
    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-2").await.expect("job");
    assert_eq!(job.progress.reused_items, 19);
    assert_eq!(job.progress.processed_items, 2);
    assert_eq!(job.progress.failed_items, 0);

    let summary = parse_summary(&state, "cat-2").await;
    assert_eq!(summary.updated_items, 1);
    assert_eq!(summary.new_items, 1);
    assert_eq!(summary.unchanged_items, 19);
    assert_eq!(summary.removed_items, 1);

    let items = catalog_items::list_items(state.db.pool(), "cat-2").await.expect("items");
    let repacked = items.iter().find(|item| item.sku == "BLM100").expect("BLM100");
    assert_eq!(repacked.change_type, ChangeType::Updated);
    assert_eq!(repacked.pack.as_deref(), Some("24/3oz"));
    assert!(!repacked.approved);
    let added = items.iter().find(|item| item.sku == "BLM299").expect("BLM299");
    assert_eq!(added.change_type, ChangeType::New);
    assert!(items.iter().all(|item| item.sku != "BLM204"));
}

#[tokio::test]
async fn sku_lost_between_passes_fails_only_that_item() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scanned = catalog_layout(&[bloom_items(100, 2)]);
    let parsed = catalog_layout(&[bloom_items(100, 1)]);
    let extractor = Arc::new(common::SequencedExtractor::new(vec![scanned, parsed]));
    let state = test_state(dir.path(), extractor).await;
    submit(&state, "cat-1", "job-1", b"opaque document").await;

    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-1").await.expect("job");
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.progress.processed_items, 1);
    assert_eq!(job.progress.failed_items, 1);
    assert_eq!(job.progress.progress_percent, 100);

    let job_rows = job_items::list_job_items(state.db.pool(), "job-1").await.expect("job items");
    let lost = job_rows.iter().find(|row| row.sku == "BLM101").expect("BLM101 row");
    assert_eq!(lost.status, JobItemStatus::Failed);
    assert_eq!(lost.attempts, 1);
    assert_eq!(lost.error_log.as_deref(), Some("SKU not found in full parse output"));

    let catalog = catalogs::get_catalog(state.db.pool(), "cat-1").await.expect("catalog");
    assert_eq!(catalog.parse_status, Some(ParseStatus::NeedsReview));
    let items = catalog_items::list_items(state.db.pool(), "cat-1").await.expect("items");
    assert_eq!(items.len(), 1);

    catalog_items::approve_all_items(state.db.pool(), "cat-1").await.expect("approve");
    assert!(catalogs::publish_catalog(state.db.pool(), "cat-1").await.is_err());
}

#[tokio::test]
async fn missing_document_fails_job_and_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    catalogs::create_catalog(state.db.pool(), "cat-1", "uploads/never-uploaded.json")
        .await
        .expect("create catalog");
    jobs::enqueue_job(state.db.pool(), "job-1", "cat-1").await.expect("enqueue");

    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-1").await.expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress_label, "failed");
    assert!(job.error_log.expect("error log").contains("never-uploaded.json"));
    assert!(job.finished_at.is_some());

    let catalog = catalogs::get_catalog(state.db.pool(), "cat-1").await.expect("catalog");
    assert_eq!(catalog.parse_status, Some(ParseStatus::Failed));
    assert_eq!(catalog.parse_summary["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_document_fails_with_extraction_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = json_state(dir.path()).await;
    submit(&state, "cat-1", "job-1", b"%PDF-1.7 not a layout dump").await;

    run_single_job(&state).await;

    let job = jobs::get_job(state.db.pool(), "job-1").await.expect("job");
    assert_eq!(job.status, JobStatus::Failed);
    let catalog = catalogs::get_catalog(state.db.pool(), "cat-1").await.expect("catalog");
    assert_eq!(catalog.parse_status, Some(ParseStatus::Failed));
    assert_eq!(catalog.parse_summary["code"], "EXTRACTION_ERROR");
}
