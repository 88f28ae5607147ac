use sha2::{Digest, Sha256};

use crate::sidecar::types::PageImage;

const NO_IMAGE: &str = "no_image";

/// Trim, lowercase and collapse internal whitespace.
pub fn normalize_text(value: Option<&str>) -> String {
    value
        .map(|text| {
            text.trim()
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Identity of an assigned image: its name plus its box rounded to 0.1 units.
pub fn image_signature(image: Option<&PageImage>) -> String {
    match image {
        Some(image) => format!(
            "{}:{:.1}:{:.1}:{:.1}:{:.1}",
            image.name, image.bbox.x0, image.bbox.x1, image.bbox.top, image.bbox.bottom
        ),
        None => NO_IMAGE.to_string(),
    }
}

/// Cheap fingerprint over raw cell geometry, text and image identity.
pub fn quick_fingerprint(sku: &str, lines: &[String], image_signature: &str) -> String {
    let normalized_lines = lines
        .iter()
        .map(|line| normalize_text(Some(line)))
        .collect::<Vec<_>>()
        .join(" | ");
    let payload = [normalize_text(Some(sku)), normalized_lines, image_signature.to_string()].join("|");
    sha256_hex(payload.as_bytes())
}

/// Inputs of the strong fingerprint: fully resolved fields plus image content.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFields<'a> {
    pub sku: &'a str,
    pub name: &'a str,
    pub upc: Option<&'a str>,
    pub pack: Option<&'a str>,
    pub category: &'a str,
    /// Hex digest of the image bytes, empty when there is no image.
    pub image_hash: &'a str,
}

pub fn strong_fingerprint(fields: &ResolvedFields<'_>) -> String {
    let payload = [
        normalize_text(Some(fields.sku)),
        normalize_text(Some(fields.name)),
        normalize_text(fields.upc),
        normalize_text(fields.pack),
        normalize_text(Some(fields.category)),
        fields.image_hash.to_string(),
    ]
    .join("|");
    sha256_hex(payload.as_bytes())
}

pub fn image_hash(bytes: Option<&[u8]>) -> String {
    bytes.map(sha256_hex).unwrap_or_default()
}
