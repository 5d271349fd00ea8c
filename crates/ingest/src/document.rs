use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SplitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Only paginated formats expose a page count
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

/// Opaque statement payload plus its declared media type.
#[derive(Debug, Clone)]
pub struct Document {
    pub doc_id: String,
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl Document {
    pub fn new(bytes: Vec<u8>, media_type: MediaType) -> Self {
        let doc_id = generate_doc_id(&bytes);
        Self {
            doc_id,
            bytes,
            media_type,
        }
    }

    /// Page count for paginated documents, `None` when the format has no pages.
    pub fn page_count(&self) -> Result<Option<usize>, SplitError> {
        if !self.media_type.is_paginated() {
            return Ok(None);
        }

        let pdf = lopdf::Document::load_mem(&self.bytes)
            .map_err(|e| SplitError::MalformedDocument(e.to_string()))?;

        Ok(Some(pdf.get_pages().len()))
    }
}

/// Stable document ID from content
pub fn generate_doc_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
