mod common;

use std::collections::HashSet;

use catalog_sync_lib::{
    catalog::{
        parser::{parse_catalog, parse_layout},
        scanner::{scan_catalog, scan_layout},
    },
    core::types::ParseIssue,
    sidecar::{
        layout_reader::JsonLayoutExtractor,
        types::{ImageBlob, LayoutPayload},
    },
};
use common::{bloom_items, catalog_layout, grid_page, image_bytes_for, layout_bytes, ItemSpec};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn two_page_layout() -> LayoutPayload {
    catalog_layout(&[bloom_items(100, 16), bloom_items(200, 5)])
}

#[test]
fn scan_is_deterministic_and_ordered() {
    let layout = two_page_layout();
    let first = scan_layout(&layout);
    let second = scan_layout(&layout);
    assert_eq!(first, second);
    assert_eq!(first.page_count, 2);
    assert_eq!(first.candidates.len(), 21);

    let skus: Vec<&str> = first.candidates.iter().map(|candidate| candidate.sku.as_str()).collect();
    assert_eq!(&skus[..5], &["BLM100", "BLM101", "BLM102", "BLM103", "BLM104"]);
    assert_eq!(skus[16], "BLM200");
    assert!(first.candidates[..16].iter().all(|candidate| candidate.page_no == 1));
    assert!(first.candidates[16..].iter().all(|candidate| candidate.page_no == 2));
}

#[test]
fn scan_candidate_carries_cell_lines_and_image_box() {
    let layout = catalog_layout(&[bloom_items(100, 1)]);
    let scan = scan_layout(&layout);
    let candidate = &scan.candidates[0];
    assert_eq!(
        candidate.lines,
        vec!["BLM100", "Sour Sticks 100", "032797000100", "12/3oz"]
    );
    let image_bbox = candidate.image_bbox.expect("image assigned");
    assert_eq!(image_bbox.top, 180.0);
    assert_eq!(candidate.quick_fingerprint.len(), 64);
}

#[test]
fn full_parse_resolves_fields_and_image_bytes() {
    let items = parse_layout(&two_page_layout(), None).expect("parse");
    assert_eq!(items.len(), 21);

    let first = &items[0];
    assert_eq!(first.sku, "BLM100");
    assert_eq!(first.name, "Sour Sticks 100");
    assert_eq!(first.upc.as_deref(), Some("032797000100"));
    assert_eq!(first.pack.as_deref(), Some("12/3oz"));
    assert_eq!(first.category, "Bloom's");
    assert!(first.parse_issues.is_empty());

    for item in &items {
        assert_eq!(item.image_bytes.as_deref(), Some(image_bytes_for(&item.sku).as_slice()));
        assert_eq!(item.image_extension.as_deref(), Some("png"));
    }
}

#[test]
fn full_parse_keeps_first_occurrence_of_repeated_sku() {
    let mut repeated = bloom_items(100, 2);
    repeated[1] = ItemSpec::new("BLM100", "Sour Sticks Reprint", "032797000999", "24/3oz");
    let layout = catalog_layout(&[bloom_items(100, 4), repeated]);

    assert_eq!(scan_layout(&layout).candidates.len(), 6);

    let items = parse_layout(&layout, None).expect("parse");
    let occurrences = items.iter().filter(|item| item.sku == "BLM100").count();
    assert_eq!(occurrences, 1);
    assert_eq!(items.len(), 4);
    let kept = items.iter().find(|item| item.sku == "BLM100").expect("BLM100 parsed");
    assert_eq!(kept.name, "Sour Sticks 100");
}

#[test]
fn sku_filter_yields_intersection_with_document() {
    let layout = two_page_layout();
    let filter: HashSet<String> = ["BLM101", "BLM203", "NOPE999"].iter().map(|s| s.to_string()).collect();
    let items = parse_layout(&layout, Some(&filter)).expect("parse");
    let skus: HashSet<&str> = items.iter().map(|item| item.sku.as_str()).collect();
    assert_eq!(skus, HashSet::from(["BLM101", "BLM203"]));
}

#[test]
fn issues_are_sorted_and_cover_image_pack_and_category() {
    let lonely = ItemSpec::new("XYZ100", "Chocolate Coins", "032797001000", "")
        .without_pack()
        .without_image();
    let layout = catalog_layout(&[vec![lonely]]);
    let items = parse_layout(&layout, None).expect("parse");
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.name, "Chocolate Coins");
    assert_eq!(item.upc.as_deref(), Some("032797001000"));
    assert_eq!(item.category, "Uncategorized");
    assert_eq!(
        item.parse_issues,
        vec![ParseIssue::MissingImage, ParseIssue::MissingPack, ParseIssue::UnknownCategory]
    );
    assert!(item.image_bytes.is_none());
}

#[test]
fn unresolvable_image_blob_is_reported_missing() {
    let mut page = grid_page(1, &bloom_items(100, 1));
    page.image_blobs.clear();
    let items = parse_layout(&LayoutPayload { pages: vec![page] }, None).expect("parse");
    assert_eq!(items[0].parse_issues, vec![ParseIssue::MissingImage]);
    assert!(items[0].image_bytes.is_none());
}

#[test]
fn corrupt_image_blob_only_flags_its_own_item() {
    let mut page = grid_page(1, &bloom_items(100, 2));
    page.image_blobs[0].data_base64 = "not base64 at all!".to_string();
    let items = parse_layout(&LayoutPayload { pages: vec![page] }, None).expect("parse");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].sku, "BLM100");
    assert_eq!(items[0].parse_issues, vec![ParseIssue::MissingImage]);
    assert!(items[0].image_bytes.is_none());
    assert!(items[0].image_extension.is_none());

    assert!(items[1].parse_issues.is_empty());
    assert_eq!(items[1].image_bytes.as_deref(), Some(image_bytes_for("BLM101").as_slice()));
}

#[test]
fn extension_is_sniffed_when_blob_name_has_none() {
    let mut page = grid_page(1, &bloom_items(100, 1));
    page.image_blobs = vec![ImageBlob::new("Im1_0", PNG_MAGIC)];
    let items = parse_layout(&LayoutPayload { pages: vec![page] }, None).expect("parse");
    assert_eq!(items[0].image_extension.as_deref(), Some("png"));
    assert_eq!(items[0].image_bytes.as_deref(), Some(PNG_MAGIC));
}

#[test]
fn json_extractor_feeds_scan_and_parse() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("catalog.layout.json");
    std::fs::write(&path, layout_bytes(&two_page_layout())).expect("write layout");

    let scan = scan_catalog(&JsonLayoutExtractor, &path).expect("scan");
    assert_eq!(scan.candidates.len(), 21);
    let items = parse_catalog(&JsonLayoutExtractor, &path, None).expect("parse");
    assert_eq!(items.len(), 21);
}

#[test]
fn malformed_layout_is_an_extraction_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{\"pages\": [{\"width\": 0, \"height\": 10}]}").expect("write layout");
    let err = scan_catalog(&JsonLayoutExtractor, &path).expect_err("zero width page");
    assert_eq!(err.code(), "EXTRACTION_ERROR");

    std::fs::write(&path, b"not json").expect("write layout");
    let err = parse_catalog(&JsonLayoutExtractor, &path, None).expect_err("not json");
    assert_eq!(err.code(), "EXTRACTION_ERROR");
}
