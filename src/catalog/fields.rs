//! Name / UPC / pack heuristics over the text lines of one cell.

use once_cell::sync::Lazy;
use regex::Regex;

const UPC_MIN_DIGITS: usize = 8;
const UPC_MAX_DIGITS: usize = 14;

static PACK_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+\s*/\s*[\w.\- ]+)|(oz|gr|g|lb|pc)").expect("valid pack hint regex")
});
static STRONG_PACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*[/-]\s*[\w.\- ]+").expect("valid strong pack regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFields {
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_pack_line(text: &str) -> bool {
    PACK_HINT_RE.is_match(text)
}

pub fn is_strong_pack_line(text: &str) -> bool {
    STRONG_PACK_RE.is_match(text)
}

pub fn is_upc_line(text: &str) -> bool {
    let digits = digits_only(text).len();
    (UPC_MIN_DIGITS..=UPC_MAX_DIGITS).contains(&digits) && !is_pack_line(text)
}

/// Splits the lines following the SKU anchor into name, UPC and pack.
///
/// The UPC is the first UPC-shaped line. The pack prefers a strong (ratio)
/// candidate after the UPC, then one before it, then any candidate after it,
/// then the first candidate at all. The name is built from what precedes the
/// UPC, falling back to every remaining line, and finally to the SKU itself.
pub fn parse_fields(sku: &str, lines: &[String]) -> ParsedFields {
    let anchor = lines.iter().position(|line| line == sku).unwrap_or(0);
    let after: &[String] = lines.get(anchor + 1..).unwrap_or(&[]);

    let upc_index = after.iter().position(|line| is_upc_line(line));
    let upc = upc_index.map(|index| digits_only(&after[index]));

    let pack_candidates: Vec<usize> = after
        .iter()
        .enumerate()
        .filter(|(_, line)| is_pack_line(line))
        .map(|(index, _)| index)
        .collect();
    let first_strong = |group: &[usize]| -> Option<usize> {
        group
            .iter()
            .copied()
            .find(|&index| is_strong_pack_line(&after[index]))
    };

    let pack_index = if pack_candidates.is_empty() {
        None
    } else if let Some(upc_at) = upc_index {
        let after_upc: Vec<usize> = pack_candidates.iter().copied().filter(|&i| i > upc_at).collect();
        let before_upc: Vec<usize> = pack_candidates.iter().copied().filter(|&i| i < upc_at).collect();
        first_strong(&after_upc)
            .or_else(|| first_strong(&before_upc))
            .or_else(|| after_upc.first().copied())
            .or_else(|| pack_candidates.first().copied())
    } else {
        first_strong(&pack_candidates).or_else(|| pack_candidates.first().copied())
    };
    let pack = pack_index.map(|index| after[index].clone());

    let mut before_upc_parts: Vec<&str> = Vec::new();
    let mut remaining_parts: Vec<&str> = Vec::new();
    for (index, line) in after.iter().enumerate() {
        if Some(index) == upc_index || Some(index) == pack_index {
            continue;
        }
        remaining_parts.push(line);
        if upc_index.is_some_and(|upc_at| index < upc_at) {
            before_upc_parts.push(line);
        }
    }

    let name_parts = if before_upc_parts.is_empty() {
        remaining_parts
    } else {
        before_upc_parts
    };
    let name = name_parts.join(" ").trim().to_string();
    let name = if name.is_empty() { sku.to_string() } else { name };

    ParsedFields { name, upc, pack }
}
