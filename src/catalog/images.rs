use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::{lines::round_to, HEADER_BAND_TOP};
use crate::sidecar::types::{PageImage, Token};

/// Images must start at least this far below the SKU's top edge...
const MIN_DROP: f64 = 20.0;
/// ...and no further than this.
const MAX_DROP: f64 = 220.0;
const MAX_HORIZONTAL_OFFSET: f64 = 80.0;
/// Where an item image usually starts relative to its SKU.
const EXPECTED_DROP: f64 = 40.0;
const HORIZONTAL_WEIGHT: f64 = 0.25;

static SKU_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9\-/]{2,}\d{2,}$").expect("valid sku regex"));

pub fn is_sku_token(text: &str) -> bool {
    SKU_RE.is_match(text)
}

#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    pub sku: &'a Token,
    pub image: Option<&'a PageImage>,
}

/// Below-letterhead images of a page, in extraction order.
pub fn item_images(images: &[PageImage]) -> Vec<&PageImage> {
    images
        .iter()
        .filter(|image| image.bbox.top > HEADER_BAND_TOP)
        .collect()
}

/// SKU-shaped tokens below the letterhead, in (row, column) order.
pub fn sku_tokens(words: &[Token]) -> Vec<&Token> {
    let mut skus: Vec<&Token> = words
        .iter()
        .filter(|word| word.bbox.top > HEADER_BAND_TOP && is_sku_token(&word.text))
        .collect();
    skus.sort_by(|a, b| {
        round_to(a.bbox.top, 2)
            .total_cmp(&round_to(b.bbox.top, 2))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    skus
}

/// Pairs every SKU token on a page with the closest unclaimed image below it.
///
/// SKUs are visited in (row, column) order and each image is handed out at
/// most once, so an earlier SKU always wins a contested image.
pub fn assign_images<'a>(words: &'a [Token], images: &'a [PageImage]) -> Vec<Assignment<'a>> {
    let candidates = item_images(images);
    let mut claimed = vec![false; candidates.len()];
    let mut assignments = Vec::new();

    for sku in sku_tokens(words) {
        let sku_x = sku.bbox.center_x();
        let sku_top = sku.bbox.top;

        let mut best: Option<(f64, usize)> = None;
        for (index, image) in candidates.iter().enumerate() {
            if claimed[index] {
                continue;
            }
            let image_x = image.bbox.center_x();
            let image_top = image.bbox.top;
            if !(image_top > sku_top + MIN_DROP && image_top < sku_top + MAX_DROP) {
                continue;
            }
            let dx = (image_x - sku_x).abs();
            if dx > MAX_HORIZONTAL_OFFSET {
                continue;
            }
            let score = (image_top - (sku_top + EXPECTED_DROP)).abs() + HORIZONTAL_WEIGHT * dx;
            if best.map_or(true, |(best_score, _)| score < best_score) {
                best = Some((score, index));
            }
        }

        let image = best.map(|(_, index)| {
            claimed[index] = true;
            candidates[index]
        });
        assignments.push(Assignment { sku, image });
    }

    assignments
}
