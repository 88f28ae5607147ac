use std::path::Path;

use crate::{
    catalog::{
        cells::{cell_bounds, cell_tokens},
        fingerprint::{image_signature, quick_fingerprint},
        images::assign_images,
        lines::assemble_lines,
        types::{Candidate, CatalogScan},
    },
    core::errors::AppResult,
    sidecar::{layout_reader::DocumentExtractor, types::LayoutPayload},
};

/// Fast pass: one candidate per SKU token, without field heuristics or image bytes.
pub fn scan_catalog(extractor: &dyn DocumentExtractor, path: &Path) -> AppResult<CatalogScan> {
    let payload = extractor.extract(path)?;
    Ok(scan_layout(&payload))
}

pub fn scan_layout(payload: &LayoutPayload) -> CatalogScan {
    let mut candidates = Vec::new();
    for (page_index, page) in payload.pages.iter().enumerate() {
        for assignment in assign_images(&page.words, &page.images) {
            let cell = cell_bounds(page, assignment.sku, assignment.image);
            let lines = assemble_lines(&cell_tokens(&page.words, &cell));
            let quick_fingerprint = quick_fingerprint(
                &assignment.sku.text,
                &lines,
                &image_signature(assignment.image),
            );
            candidates.push(Candidate {
                sku: assignment.sku.text.clone(),
                page_no: page_index as i64 + 1,
                sku_bbox: assignment.sku.bbox,
                image_bbox: assignment.image.map(|image| image.bbox),
                lines,
                quick_fingerprint,
            });
        }
    }

    CatalogScan {
        page_count: payload.page_count(),
        candidates,
    }
}
