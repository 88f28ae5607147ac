#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use catalog_sync_lib::{
    core::{config::WorkerConfig, errors::AppResult},
    db::Database,
    sidecar::{
        layout_reader::{DocumentExtractor, JsonLayoutExtractor},
        types::{BBox, ImageBlob, LayoutPayload, PageImage, PageLayout, Token},
    },
    storage::FsObjectStore,
    AppState,
};

pub const PAGE_WIDTH: f64 = 612.0;
pub const PAGE_HEIGHT: f64 = 792.0;
pub const COLUMNS: usize = 4;
pub const ROWS: usize = 4;
const CHAR_WIDTH: f64 = 4.0;
const WORD_GAP: f64 = 3.0;
const TOKEN_HEIGHT: f64 = 8.0;

/// One catalog entry as printed: SKU, then name, UPC and pack lines.
#[derive(Debug, Clone)]
pub struct ItemSpec {
    pub sku: String,
    pub name: String,
    pub upc: Option<String>,
    pub pack: Option<String>,
    pub with_image: bool,
}

impl ItemSpec {
    pub fn new(sku: &str, name: &str, upc: &str, pack: &str) -> Self {
        Self {
            sku: sku.to_string(),
            name: name.to_string(),
            upc: Some(upc.to_string()),
            pack: Some(pack.to_string()),
            with_image: true,
        }
    }

    pub fn without_pack(mut self) -> Self {
        self.pack = None;
        self
    }

    pub fn without_upc(mut self) -> Self {
        self.upc = None;
        self
    }

    pub fn without_image(mut self) -> Self {
        self.with_image = false;
        self
    }
}

/// `count` Bloom's items with distinct SKUs starting at `first`.
pub fn bloom_items(first: usize, count: usize) -> Vec<ItemSpec> {
    (first..first + count)
        .map(|n| ItemSpec::new(&format!("BLM{n}"), &format!("Sour Sticks {n}"), &format!("0327970{n:05}"), "12/3oz"))
        .collect()
}

pub fn image_bytes_for(sku: &str) -> Vec<u8> {
    format!("png-bytes-{sku}").into_bytes()
}

pub fn column_center(column: usize) -> f64 {
    80.0 + column as f64 * 150.0
}

pub fn row_top(row: usize) -> f64 {
    130.0 + row as f64 * 175.0
}

/// Splits `text` into word tokens starting at `x0`.
pub fn line_tokens(text: &str, x0: f64, top: f64) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = x0;
    for word in text.split_whitespace() {
        let width = word.chars().count() as f64 * CHAR_WIDTH;
        tokens.push(Token {
            text: word.to_string(),
            bbox: BBox {
                x0: cursor,
                x1: cursor + width,
                top,
                bottom: top + TOKEN_HEIGHT,
            },
        });
        cursor += width + WORD_GAP;
    }
    tokens
}

fn letterhead() -> Vec<Token> {
    let mut words = line_tokens("www.bloomskosher.com", 250.0, 40.0);
    words.extend(line_tokens("Bloom Packaging Corp.", 240.0, 20.0));
    words
}

/// One page with items laid out row-major on a 4x4 grid.
pub fn grid_page(page_no: usize, items: &[ItemSpec]) -> PageLayout {
    assert!(items.len() <= COLUMNS * ROWS, "too many items for one page");
    let mut page = PageLayout {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        words: letterhead(),
        images: Vec::new(),
        image_blobs: Vec::new(),
    };

    for (slot, item) in items.iter().enumerate() {
        let cx = column_center(slot % COLUMNS);
        let top = row_top(slot / COLUMNS);
        let x0 = cx - 50.0;

        page.words.extend(line_tokens(&item.sku, x0, top));
        page.words.extend(line_tokens(&item.name, x0, top + 12.0));
        if let Some(upc) = &item.upc {
            page.words.extend(line_tokens(upc, x0, top + 24.0));
        }
        if let Some(pack) = &item.pack {
            page.words.extend(line_tokens(pack, x0, top + 36.0));
        }

        if item.with_image {
            let name = format!("Im{page_no}_{slot}");
            page.images.push(PageImage {
                name: name.clone(),
                bbox: BBox {
                    x0: cx - 50.0,
                    x1: cx + 50.0,
                    top: top + 50.0,
                    bottom: top + 130.0,
                },
            });
            page.image_blobs
                .push(ImageBlob::new(format!("{name}.png"), &image_bytes_for(&item.sku)));
        }
    }
    page
}

pub fn catalog_layout(pages: &[Vec<ItemSpec>]) -> LayoutPayload {
    LayoutPayload {
        pages: pages
            .iter()
            .enumerate()
            .map(|(index, items)| grid_page(index + 1, items))
            .collect(),
    }
}

pub fn layout_bytes(layout: &LayoutPayload) -> Vec<u8> {
    serde_json::to_vec(layout).expect("layout serializes")
}

/// Returns queued payloads in order, repeating the last one once drained.
pub struct SequencedExtractor {
    payloads: Mutex<VecDeque<LayoutPayload>>,
    last: Mutex<Option<LayoutPayload>>,
}

impl SequencedExtractor {
    pub fn new(payloads: Vec<LayoutPayload>) -> Self {
        Self {
            payloads: Mutex::new(payloads.into()),
            last: Mutex::new(None),
        }
    }
}

impl DocumentExtractor for SequencedExtractor {
    fn extract(&self, _path: &Path) -> AppResult<LayoutPayload> {
        let next = self.payloads.lock().expect("payload lock").pop_front();
        let mut last = self.last.lock().expect("last lock");
        if let Some(payload) = next {
            *last = Some(payload);
        }
        Ok(last.clone().unwrap_or_default())
    }
}

pub async fn test_state(root: &Path, extractor: Arc<dyn DocumentExtractor>) -> AppState {
    let db = Database::in_memory().await.expect("db should initialize");
    let config = WorkerConfig {
        data_dir: root.to_path_buf(),
        ..WorkerConfig::default()
    };
    AppState {
        db,
        store: Arc::new(FsObjectStore::new(config.object_store_root())),
        extractor,
        config,
    }
}

pub async fn json_state(root: &Path) -> AppState {
    test_state(root, Arc::new(JsonLayoutExtractor)).await
}
