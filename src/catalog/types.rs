use serde::{Deserialize, Serialize};

use crate::core::types::ParseIssue;
use crate::sidecar::types::BBox;

/// One detected SKU token from the fast pass; not deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub sku: String,
    pub page_no: i64,
    pub sku_bbox: BBox,
    pub image_bbox: Option<BBox>,
    pub lines: Vec<String>,
    pub quick_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogScan {
    pub page_count: usize,
    /// Page-ascending, then (row, column) within a page.
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub sku: String,
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
    pub category: String,
    pub parse_issues: Vec<ParseIssue>,
    pub image_bytes: Option<Vec<u8>>,
    pub image_extension: Option<String>,
}
