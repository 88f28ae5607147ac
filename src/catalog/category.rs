use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::ParseIssue;

pub const UNCATEGORIZED: &str = "Uncategorized";

const PREFIX_CATEGORIES: &[(&str, &str)] = &[
    ("BLK", "Misc"),
    ("BLM", "Bloom's"),
    ("CC", "Coca Cola / Beverages"),
    ("CON", "Dubble Bubble"),
    ("DP", "Pressels"),
    ("FAMS", "Famous"),
    ("GRAN", "General Mills / Fruit Snacks"),
    ("HER", "Hershey"),
    ("JB", "Mike & Ike / Just Born"),
    ("JMP", "Jump Juice"),
    ("JOY", "Joyva"),
    ("KALI", "Kali Tzom"),
    ("KOP", "Misc"),
    ("LOT", "Lotus"),
    ("LS", "Mentos / Imported"),
    ("LT", "Laffy Taffy"),
    ("MGD", "Israeli Imports"),
    ("MIMI", "Mimi"),
    ("ONG", "Oneg"),
    ("OREO", "Oreo"),
    ("RP", "Ring Pops"),
    ("SCH", "Schmerling"),
    ("SHL", "Fruit Leather"),
    ("SIZ", "Sizgit"),
    ("SPR", "Spring Juice"),
    ("TIC", "Tic Tac"),
    ("TRP", "Misc"),
    ("ZK", "Twizzlers / Licorice"),
];

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)").expect("valid sku prefix regex"));

/// Category for the SKU's leading run of uppercase letters, if that prefix is mapped.
pub fn category_from_sku(sku: &str) -> Option<&'static str> {
    let prefix = PREFIX_RE.captures(sku)?.get(1)?.as_str();
    PREFIX_CATEGORIES
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|(_, category)| *category)
}

/// Like [`category_from_sku`] but falls back to [`UNCATEGORIZED`] and reports the miss.
pub fn resolve_category(sku: &str) -> (String, Option<ParseIssue>) {
    match category_from_sku(sku) {
        Some(category) => (category.to_string(), None),
        None => (UNCATEGORIZED.to_string(), Some(ParseIssue::UnknownCategory)),
    }
}
