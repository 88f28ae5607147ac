use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    core::errors::{AppError, AppResult},
    sidecar::types::BBox,
};

fn unknown_variant(kind: &str, raw: &str) -> AppError {
    AppError::Database(format!("unknown {kind} '{raw}'"))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(raw: &str) -> AppResult<Self> {
        match raw {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(unknown_variant("job status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobItemStatus {
    Queued,
    Processing,
    Reused,
    Success,
    Failed,
}

impl JobItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Reused => "reused",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(raw: &str) -> AppResult<Self> {
        match raw {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "reused" => Ok(Self::Reused),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(unknown_variant("job item status", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reused | Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    New,
    Updated,
    Unchanged,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Removed => "removed",
        }
    }

    pub fn from_db(raw: &str) -> AppResult<Self> {
        match raw {
            "new" => Ok(Self::New),
            "updated" => Ok(Self::Updated),
            "unchanged" => Ok(Self::Unchanged),
            "removed" => Ok(Self::Removed),
            other => Err(unknown_variant("change type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    Draft,
    Published,
}

impl CatalogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn from_db(raw: &str) -> AppResult<Self> {
        match raw {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(unknown_variant("catalog status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Processing,
    NeedsReview,
    Failed,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::NeedsReview => "needs_review",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(raw: &str) -> AppResult<Self> {
        match raw {
            "processing" => Ok(Self::Processing),
            "needs_review" => Ok(Self::NeedsReview),
            "failed" => Ok(Self::Failed),
            other => Err(unknown_variant("parse status", other)),
        }
    }
}

/// Recoverable per-item problems. Variant order matches the sorted tag order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParseIssue {
    MissingImage,
    MissingPack,
    UnknownCategory,
}

impl ParseIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingImage => "missing_image",
            Self::MissingPack => "missing_pack",
            Self::UnknownCategory => "unknown_category",
        }
    }
}

/// Sorts and deduplicates issue tags in place.
pub fn normalize_issues(issues: &mut Vec<ParseIssue>) {
    issues.sort();
    issues.dedup();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedJob {
    pub id: String,
    pub catalog_id: String,
    pub attempts: i64,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub catalog_id: String,
    pub status: JobStatus,
    pub attempts: i64,
    pub error_log: Option<String>,
    pub progress: ProgressSummary,
    pub progress_label: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct JobItemRecord {
    pub parser_job_id: String,
    pub catalog_id: String,
    pub sku: String,
    pub quick_fingerprint: String,
    pub page_no: i64,
    pub sku_bbox: BBox,
    pub image_bbox: Option<BBox>,
    pub status: JobItemStatus,
    pub error_log: Option<String>,
    pub attempts: i64,
}

#[derive(Debug, Clone)]
pub struct CatalogRecord {
    pub id: String,
    pub pdf_storage_path: String,
    pub status: CatalogStatus,
    pub parse_status: Option<ParseStatus>,
    pub parse_summary: Value,
    pub baseline_catalog_id: Option<String>,
    pub pdf_sha256: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItemRecord {
    pub catalog_id: String,
    pub sku: String,
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
    pub category: String,
    pub image_storage_path: String,
    pub parse_issues: Vec<ParseIssue>,
    pub approved: bool,
    pub signature: String,
    pub quick_fingerprint: String,
    pub change_type: ChangeType,
}

/// Fields resolved by a full parse, keyed by `(sku, quick_fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub sku: String,
    pub quick_fingerprint: String,
    pub strong_fingerprint: String,
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
    pub category: String,
    pub image_storage_path: String,
}

/// Row of the published catalog a run is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineItem {
    pub sku: String,
    pub signature: String,
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSummary {
    pub raw_candidates: i64,
    pub unique_skus: i64,
    pub total_items: i64,
    pub reused_items: i64,
    pub queued_items: i64,
    pub processed_items: i64,
    pub failed_items: i64,
    pub parsed_pages: i64,
    pub total_pages: i64,
    pub progress_percent: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageItemCount {
    pub page_no: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureVerification {
    pub capture_verification_passed: bool,
    pub per_page_item_count: i64,
    pub expected_items_min: i64,
    pub expected_items_max: i64,
    pub non_last_page_count_mismatches: Vec<PageItemCount>,
    pub last_page_item_count: i64,
    pub actual_unique_skus: i64,
}

/// `parse_summary` payload written when a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogParseSummary {
    #[serde(flatten)]
    pub progress: ProgressSummary,
    pub new_items: i64,
    pub updated_items: i64,
    pub unchanged_items: i64,
    pub removed_items: i64,
    pub missing_images: i64,
    pub unknown_categories: i64,
    pub baseline_catalog_id: Option<String>,
    pub pdf_sha256: String,
    pub capture_verification: CaptureVerification,
}
