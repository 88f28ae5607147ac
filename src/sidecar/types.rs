use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::core::errors::AppResult;

/// Axis-aligned box in page layout units; `top` grows downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// True when `other` lies entirely inside this box.
    pub fn encloses(&self, other: &BBox) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.top >= self.top && other.bottom <= self.bottom
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub text: String,
    #[serde(flatten)]
    pub bbox: BBox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageImage {
    /// Identity used to look the raw bytes up in [`PageLayout::image_blobs`].
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub bbox: BBox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageBlob {
    pub name: String,
    pub data_base64: String,
}

impl ImageBlob {
    pub fn new(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode(&self) -> AppResult<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(self.data_base64.as_bytes())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub words: Vec<Token>,
    #[serde(default)]
    pub images: Vec<PageImage>,
    #[serde(default)]
    pub image_blobs: Vec<ImageBlob>,
}

/// Everything the extraction collaborator reports for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LayoutPayload {
    pub pages: Vec<PageLayout>,
}

impl LayoutPayload {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
