use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::Arc,
};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    catalog::{
        category::UNCATEGORIZED,
        fingerprint::{image_hash, sha256_hex, strong_fingerprint, ResolvedFields},
        parser::parse_catalog,
        scanner::scan_catalog,
        types::{Candidate, CatalogScan, ParsedItem},
    },
    core::{
        errors::{AppError, AppResult},
        types::{
            normalize_issues, BaselineItem, CacheEntry, CatalogItemRecord, CatalogParseSummary, ChangeType,
            ClaimedJob, JobItemRecord, JobItemStatus, ParseIssue,
        },
    },
    db::{
        repositories::{cache, catalog_items, catalogs, job_items, jobs},
        Database,
    },
    sidecar::layout_reader::DocumentExtractor,
    storage::{ObjectStore, DOCUMENT_BUCKET, IMAGE_BUCKET},
    sync::{
        diff::{classify_change, count_removed, ChangeCounts},
        progress::{
            processing_summary, ProgressCounters, LABEL_FULL_PARSE_PROCESSING, LABEL_REUSING_CACHED_ITEMS,
        },
        verification::build_capture_verification,
    },
};

const MISSING_FROM_FULL_PARSE: &str = "SKU not found in full parse output";
const STAGED_DOCUMENT_NAME: &str = "catalog-document";
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Result of one queued item within a run. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Processed,
    Failed(String),
}

/// Result of one claimed job after its bookkeeping has been persisted.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Box<CatalogParseSummary>),
    Failed(AppError),
}

#[derive(Clone)]
pub struct SyncEngine {
    db: Database,
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn DocumentExtractor>,
}

impl SyncEngine {
    pub fn new(db: Database, store: Arc<dyn ObjectStore>, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { db, store, extractor }
    }

    /// Runs a claimed job to completion.
    ///
    /// Job-level errors mark both the job and its catalog `failed`; only errors
    /// while recording that failure are returned as `Err`.
    pub async fn process_job(&self, job: &ClaimedJob) -> AppResult<JobOutcome> {
        match self.run_job(job).await {
            Ok(summary) => Ok(JobOutcome::Completed(Box::new(summary))),
            Err(err) => {
                error!(
                    job_id = %job.id,
                    catalog_id = %job.catalog_id,
                    code = err.code(),
                    "catalog parse job failed: {err}"
                );
                catalogs::mark_failed(self.db.pool(), &job.catalog_id, &err).await?;
                jobs::fail_job(self.db.pool(), &job.id, &err).await?;
                Ok(JobOutcome::Failed(err))
            }
        }
    }

    async fn run_job(&self, job: &ClaimedJob) -> AppResult<CatalogParseSummary> {
        let pool = self.db.pool();
        let catalog = catalogs::get_catalog(pool, &job.catalog_id).await?;

        let document = self
            .store
            .download(DOCUMENT_BUCKET, &catalog.pdf_storage_path)
            .await?;
        if document.is_empty() {
            return Err(AppError::Storage(format!(
                "unable to download document from storage path: {}",
                catalog.pdf_storage_path
            )));
        }
        let pdf_sha256 = sha256_hex(&document);

        let staging = tempfile::Builder::new().prefix("catalog-sync-").tempdir()?;
        let staged_path = staging.path().join(STAGED_DOCUMENT_NAME);
        std::fs::write(&staged_path, &document)?;
        drop(document);

        let scan = self.scan(staged_path.clone()).await?;
        let candidates = dedupe_candidates(&scan.candidates);
        let total_items = candidates.len() as i64;
        info!(
            job_id = %job.id,
            catalog_id = %job.catalog_id,
            raw_candidates = scan.candidates.len(),
            unique_skus = total_items,
            pages = scan.page_count,
            "catalog scanned"
        );

        let capture_verification = build_capture_verification(scan.page_count, &scan.candidates, total_items);
        if !capture_verification.capture_verification_passed {
            warn!(
                job_id = %job.id,
                catalog_id = %job.catalog_id,
                per_page = capture_verification.per_page_item_count,
                last_page = capture_verification.last_page_item_count,
                mismatched_pages = capture_verification.non_last_page_count_mismatches.len(),
                "capture verification failed"
            );
        }

        let baseline_catalog_id = catalogs::find_baseline_catalog_id(pool, &job.catalog_id).await?;
        let baseline = catalog_items::load_baseline_items(pool, baseline_catalog_id.as_deref()).await?;

        let skus: Vec<String> = candidates.iter().map(|candidate| candidate.sku.clone()).collect();
        let cached: HashMap<(String, String), CacheEntry> = cache::find_entries(pool, &skus)
            .await?
            .into_iter()
            .map(|entry| ((entry.sku.clone(), entry.quick_fingerprint.clone()), entry))
            .collect();

        let mut counters = ProgressCounters {
            raw_candidates: scan.candidates.len() as i64,
            total_items,
            total_pages: scan.page_count as i64,
            ..ProgressCounters::default()
        };
        let mut changes = ChangeCounts::default();
        let mut missing_images = 0_i64;
        let mut unknown_categories = 0_i64;
        let mut item_rows: Vec<CatalogItemRecord> = Vec::with_capacity(candidates.len());
        let mut job_item_rows: Vec<JobItemRecord> = Vec::with_capacity(candidates.len());
        let mut queued: Vec<&Candidate> = Vec::new();

        for candidate in &candidates {
            let key = (candidate.sku.clone(), candidate.quick_fingerprint.clone());
            let status = match cached.get(&key) {
                Some(entry) => {
                    let row = reused_item(&job.catalog_id, candidate, entry, &baseline);
                    if row.image_storage_path.is_empty() {
                        missing_images += 1;
                    }
                    if row.category == UNCATEGORIZED {
                        unknown_categories += 1;
                    }
                    changes.record(row.change_type);
                    item_rows.push(row);
                    counters.reused_items += 1;
                    JobItemStatus::Reused
                }
                None => {
                    queued.push(candidate);
                    counters.queued_items += 1;
                    JobItemStatus::Queued
                }
            };
            job_item_rows.push(JobItemRecord {
                parser_job_id: job.id.clone(),
                catalog_id: job.catalog_id.clone(),
                sku: candidate.sku.clone(),
                quick_fingerprint: candidate.quick_fingerprint.clone(),
                page_no: candidate.page_no,
                sku_bbox: candidate.sku_bbox,
                image_bbox: candidate.image_bbox,
                status,
                error_log: None,
                attempts: 0,
            });
        }

        job_items::replace_job_items(pool, &job.id, &job_item_rows).await?;
        catalog_items::clear_catalog_items(pool, &job.catalog_id).await?;
        self.push_progress(job, &counters, LABEL_REUSING_CACHED_ITEMS).await?;

        if !queued.is_empty() {
            let filter: HashSet<String> = queued.iter().map(|candidate| candidate.sku.clone()).collect();
            let mut parsed: HashMap<String, ParsedItem> = self
                .parse(staged_path.clone(), filter)
                .await?
                .into_iter()
                .map(|item| (item.sku.clone(), item))
                .collect();

            let mut last_suffix = 0_i64;
            for candidate in queued {
                job_items::start_item(pool, &job.id, &candidate.sku).await?;

                let outcome = match parsed.remove(&candidate.sku) {
                    Some(item) => {
                        let suffix = Utc::now().timestamp_millis().max(last_suffix + 1);
                        last_suffix = suffix;
                        let row = self
                            .store_parsed_item(&job.catalog_id, candidate, item, suffix, &baseline)
                            .await?;
                        if row.image_storage_path.is_empty() {
                            missing_images += 1;
                        }
                        if row.parse_issues.contains(&ParseIssue::UnknownCategory) {
                            unknown_categories += 1;
                        }
                        changes.record(row.change_type);
                        item_rows.push(row);
                        ItemOutcome::Processed
                    }
                    None => ItemOutcome::Failed(MISSING_FROM_FULL_PARSE.to_string()),
                };

                match outcome {
                    ItemOutcome::Failed(reason) => {
                        warn!(job_id = %job.id, sku = %candidate.sku, "{reason}");
                        counters.failed_items += 1;
                        job_items::finish_item(pool, &job.id, &candidate.sku, JobItemStatus::Failed, Some(&reason))
                            .await?;
                    }
                    ItemOutcome::Processed => {
                        counters.processed_items += 1;
                        job_items::finish_item(pool, &job.id, &candidate.sku, JobItemStatus::Success, None).await?;
                    }
                }
                self.push_progress(job, &counters, LABEL_FULL_PARSE_PROCESSING).await?;
            }
        }

        catalog_items::upsert_items(pool, &item_rows).await?;

        let current_skus: HashSet<&str> = item_rows.iter().map(|row| row.sku.as_str()).collect();
        let removed_items = count_removed(&baseline, &current_skus);

        let mut progress = counters.summary();
        progress.progress_percent = 100;
        let summary = CatalogParseSummary {
            progress,
            new_items: changes.new_items,
            updated_items: changes.updated_items,
            unchanged_items: changes.unchanged_items,
            removed_items,
            missing_images,
            unknown_categories,
            baseline_catalog_id,
            pdf_sha256,
            capture_verification,
        };

        catalogs::mark_needs_review(pool, &job.catalog_id, &summary).await?;
        jobs::complete_job(pool, &job.id, &summary.progress).await?;
        info!(
            job_id = %job.id,
            catalog_id = %job.catalog_id,
            reused = summary.progress.reused_items,
            processed = summary.progress.processed_items,
            failed = summary.progress.failed_items,
            new = summary.new_items,
            updated = summary.updated_items,
            removed = summary.removed_items,
            "catalog parse job complete"
        );
        Ok(summary)
    }

    async fn scan(&self, path: PathBuf) -> AppResult<CatalogScan> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || scan_catalog(extractor.as_ref(), &path))
            .await
            .map_err(|err| AppError::Internal(format!("catalog scan task failed: {err}")))?
    }

    async fn parse(&self, path: PathBuf, filter: HashSet<String>) -> AppResult<Vec<ParsedItem>> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || parse_catalog(extractor.as_ref(), &path, Some(&filter)))
            .await
            .map_err(|err| AppError::Internal(format!("catalog parse task failed: {err}")))?
    }

    async fn push_progress(&self, job: &ClaimedJob, counters: &ProgressCounters, label: &str) -> AppResult<()> {
        let progress = counters.summary();
        jobs::update_progress(self.db.pool(), &job.id, &progress, label).await?;
        catalogs::mark_processing(self.db.pool(), &job.catalog_id, &processing_summary(&progress, label)?).await
    }

    /// Uploads the item's image, fingerprints it, and refreshes its cache entry.
    async fn store_parsed_item(
        &self,
        catalog_id: &str,
        candidate: &Candidate,
        item: ParsedItem,
        suffix: i64,
        baseline: &HashMap<String, BaselineItem>,
    ) -> AppResult<CatalogItemRecord> {
        let image_storage_path = match item.image_bytes.as_deref() {
            Some(bytes) => {
                let extension = item.image_extension.as_deref().unwrap_or(DEFAULT_IMAGE_EXTENSION);
                let path = image_storage_path(catalog_id, &item.sku, suffix, extension);
                self.store.upload(IMAGE_BUCKET, &path, bytes).await?;
                path
            }
            None => String::new(),
        };

        let image_hash = image_hash(item.image_bytes.as_deref());
        let signature = strong_fingerprint(&ResolvedFields {
            sku: &item.sku,
            name: &item.name,
            upc: item.upc.as_deref(),
            pack: item.pack.as_deref(),
            category: &item.category,
            image_hash: &image_hash,
        });
        let change_type = classify_change(&item.sku, &signature, baseline);

        cache::upsert_entry(
            self.db.pool(),
            &CacheEntry {
                sku: item.sku.clone(),
                quick_fingerprint: candidate.quick_fingerprint.clone(),
                strong_fingerprint: signature.clone(),
                name: item.name.clone(),
                upc: item.upc.clone(),
                pack: item.pack.clone(),
                category: item.category.clone(),
                image_storage_path: image_storage_path.clone(),
            },
        )
        .await?;

        Ok(CatalogItemRecord {
            catalog_id: catalog_id.to_string(),
            sku: item.sku,
            name: item.name,
            upc: item.upc,
            pack: item.pack,
            category: item.category,
            image_storage_path,
            parse_issues: item.parse_issues,
            approved: change_type == ChangeType::Unchanged,
            signature,
            quick_fingerprint: candidate.quick_fingerprint.clone(),
            change_type,
        })
    }
}

/// First occurrence of each SKU, in scan order.
pub fn dedupe_candidates(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut seen: HashSet<&str> = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| seen.insert(candidate.sku.as_str()))
        .cloned()
        .collect()
}

/// `catalog-items/{catalog_id}/{sku}-{suffix}.{extension}` with a filename-safe extension.
pub fn image_storage_path(catalog_id: &str, sku: &str, suffix: i64, extension: &str) -> String {
    let safe: String = extension
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
        .collect();
    let extension = if safe.is_empty() { DEFAULT_IMAGE_EXTENSION } else { safe.as_str() };
    format!("catalog-items/{catalog_id}/{sku}-{suffix}.{extension}")
}

/// Issue tags recoverable from a cache entry alone.
pub fn cached_issues(entry: &CacheEntry) -> Vec<ParseIssue> {
    let mut issues = Vec::new();
    if entry.image_storage_path.is_empty() {
        issues.push(ParseIssue::MissingImage);
    }
    if entry.pack.is_none() {
        issues.push(ParseIssue::MissingPack);
    }
    if entry.category == UNCATEGORIZED {
        issues.push(ParseIssue::UnknownCategory);
    }
    normalize_issues(&mut issues);
    issues
}

fn reused_item(
    catalog_id: &str,
    candidate: &Candidate,
    entry: &CacheEntry,
    baseline: &HashMap<String, BaselineItem>,
) -> CatalogItemRecord {
    let change_type = classify_change(&candidate.sku, &entry.strong_fingerprint, baseline);
    CatalogItemRecord {
        catalog_id: catalog_id.to_string(),
        sku: candidate.sku.clone(),
        name: entry.name.clone(),
        upc: entry.upc.clone(),
        pack: entry.pack.clone(),
        category: entry.category.clone(),
        image_storage_path: entry.image_storage_path.clone(),
        parse_issues: cached_issues(entry),
        approved: change_type == ChangeType::Unchanged,
        signature: entry.strong_fingerprint.clone(),
        quick_fingerprint: candidate.quick_fingerprint.clone(),
        change_type,
    }
}
