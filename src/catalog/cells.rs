use crate::sidecar::types::{BBox, PageImage, PageLayout, Token};

const IMAGE_SIDE_PADDING: f64 = 8.0;
const IMAGE_BOTTOM_PADDING: f64 = 5.0;
const TOP_PADDING: f64 = 4.0;
const FALLBACK_LEFT: f64 = 90.0;
const FALLBACK_RIGHT: f64 = 140.0;
const FALLBACK_DEPTH: f64 = 70.0;

/// Region of a page attributed to one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub bounds: BBox,
    /// Set when no image was assigned and the fixed-offset box was used.
    pub fallback: bool,
}

pub fn cell_bounds(page: &PageLayout, sku: &Token, image: Option<&PageImage>) -> Cell {
    let (bounds, fallback) = match image {
        Some(image) => (
            BBox {
                x0: image.bbox.x0 - IMAGE_SIDE_PADDING,
                x1: image.bbox.x1 + IMAGE_SIDE_PADDING,
                top: sku.bbox.top - TOP_PADDING,
                bottom: image.bbox.bottom + IMAGE_BOTTOM_PADDING,
            },
            false,
        ),
        None => (
            BBox {
                x0: sku.bbox.x0 - FALLBACK_LEFT,
                x1: sku.bbox.x1 + FALLBACK_RIGHT,
                top: sku.bbox.top - TOP_PADDING,
                bottom: sku.bbox.top + FALLBACK_DEPTH,
            },
            true,
        ),
    };

    Cell {
        bounds: BBox {
            x0: bounds.x0.max(0.0),
            x1: bounds.x1.min(page.width),
            top: bounds.top.max(0.0),
            bottom: bounds.bottom.min(page.height),
        },
        fallback,
    }
}

/// Tokens lying entirely inside the cell.
pub fn cell_tokens<'a>(words: &'a [Token], cell: &Cell) -> Vec<&'a Token> {
    words
        .iter()
        .filter(|word| cell.bounds.encloses(&word.bbox))
        .collect()
}
