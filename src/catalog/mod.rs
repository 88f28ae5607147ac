//! Catalog page segmentation and field extraction.

pub mod category;
pub mod cells;
pub mod fields;
pub mod fingerprint;
pub mod images;
pub mod lines;
pub mod parser;
pub mod scanner;
pub mod types;

/// Tokens and images at or above this offset belong to the page letterhead.
pub const HEADER_BAND_TOP: f64 = 120.0;
