//! Document extraction boundary.
//!
//! Decoding the catalog document into positioned words and images happens
//! outside this crate; the worker consumes the resulting layout dump.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::core::errors::{AppError, AppResult};
use crate::sidecar::types::LayoutPayload;

pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> AppResult<LayoutPayload>;
}

/// Reads a JSON layout dump (`{"pages": [...]}`) produced by the extraction sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayoutExtractor;

impl DocumentExtractor for JsonLayoutExtractor {
    fn extract(&self, path: &Path) -> AppResult<LayoutPayload> {
        let file = File::open(path)
            .map_err(|e| AppError::Io(format!("cannot read layout {}: {e}", path.display())))?;
        let payload: LayoutPayload = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::Extraction(format!("layout dump is malformed: {e}")))?;

        for (index, page) in payload.pages.iter().enumerate() {
            if !(page.width > 0.0 && page.height > 0.0) {
                return Err(AppError::Extraction(format!(
                    "page {} has invalid extent {}x{}",
                    index + 1,
                    page.width,
                    page.height
                )));
            }
        }
        Ok(payload)
    }
}
