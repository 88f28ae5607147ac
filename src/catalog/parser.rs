use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, warn};

use crate::{
    catalog::{
        category::resolve_category,
        cells::{cell_bounds, cell_tokens},
        fields::parse_fields,
        images::assign_images,
        lines::assemble_lines,
        types::ParsedItem,
    },
    core::{
        errors::AppResult,
        types::{normalize_issues, ParseIssue},
    },
    sidecar::{
        layout_reader::DocumentExtractor,
        types::{ImageBlob, LayoutPayload, PageImage},
    },
};

/// Full pass producing parsed items, deduplicated by SKU (first occurrence wins).
///
/// With a `sku_filter`, only those SKUs are processed; the output is the
/// intersection of the filter and the SKUs present in the document.
pub fn parse_catalog(
    extractor: &dyn DocumentExtractor,
    path: &Path,
    sku_filter: Option<&HashSet<String>>,
) -> AppResult<Vec<ParsedItem>> {
    let payload = extractor.extract(path)?;
    parse_layout(&payload, sku_filter)
}

pub fn parse_layout(
    payload: &LayoutPayload,
    sku_filter: Option<&HashSet<String>>,
) -> AppResult<Vec<ParsedItem>> {
    let mut items: Vec<ParsedItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (page_index, page) in payload.pages.iter().enumerate() {
        let selected: Vec<_> = assign_images(&page.words, &page.images)
            .into_iter()
            .filter(|assignment| sku_filter.map_or(true, |filter| filter.contains(&assignment.sku.text)))
            .collect();
        if selected.is_empty() {
            continue;
        }

        let blobs = if selected.iter().any(|assignment| assignment.image.is_some()) {
            index_blobs(&page.image_blobs)
        } else {
            HashMap::new()
        };

        for assignment in selected {
            let sku = assignment.sku.text.as_str();
            if seen.contains(sku) {
                debug!(sku, page_no = page_index + 1, "skipping repeated sku");
                continue;
            }

            let mut issues: Vec<ParseIssue> = Vec::new();
            let cell = cell_bounds(page, assignment.sku, assignment.image);
            if cell.fallback {
                issues.push(ParseIssue::MissingImage);
            }

            let lines = assemble_lines(&cell_tokens(&page.words, &cell));
            let fields = parse_fields(sku, &lines);

            let (category, category_issue) = resolve_category(sku);
            issues.extend(category_issue);
            if fields.pack.is_none() {
                issues.push(ParseIssue::MissingPack);
            }

            let mut image_bytes = None;
            let mut image_extension = None;
            if let Some(image) = assignment.image {
                match resolve_blob(&blobs, image).map(|blob| (blob, blob.decode())) {
                    Some((blob, Ok(bytes))) => {
                        image_extension = image_extension_for(&blob.name, &bytes);
                        image_bytes = Some(bytes);
                    }
                    Some((blob, Err(err))) => {
                        warn!(sku, blob = %blob.name, "undecodable image blob: {err}");
                        issues.push(ParseIssue::MissingImage);
                    }
                    None => issues.push(ParseIssue::MissingImage),
                }
            }

            normalize_issues(&mut issues);
            seen.insert(sku.to_string());
            items.push(ParsedItem {
                sku: sku.to_string(),
                name: fields.name,
                upc: fields.upc,
                pack: fields.pack,
                category,
                parse_issues: issues,
                image_bytes,
                image_extension,
            });
        }
    }

    Ok(items)
}

/// Blobs keyed by full name and by name without extension.
fn index_blobs(blobs: &[ImageBlob]) -> HashMap<&str, &ImageBlob> {
    let mut by_name = HashMap::new();
    for blob in blobs {
        by_name.insert(blob.name.as_str(), blob);
        if let Some((stem, _)) = blob.name.split_once('.') {
            by_name.insert(stem, blob);
        }
    }
    by_name
}

fn resolve_blob<'a>(blobs: &HashMap<&str, &'a ImageBlob>, image: &PageImage) -> Option<&'a ImageBlob> {
    blobs.get(image.name.as_str()).copied()
}

/// Extension from the blob name, else sniffed from the bytes.
fn image_extension_for(blob_name: &str, bytes: &[u8]) -> Option<String> {
    if let Some((_, ext)) = blob_name.rsplit_once('.') {
        if !ext.is_empty() {
            return Some(ext.to_ascii_lowercase());
        }
    }
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().map(|ext| ext.to_string()))
}
