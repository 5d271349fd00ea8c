use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::document::{Document, MediaType};

pub struct FileReader;

impl FileReader {
    pub async fn read_document(path: &Path) -> Result<Document> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let Some(media_type) = MediaType::from_extension(extension) else {
            anyhow::bail!("Unsupported file format: {}", extension);
        };

        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        Ok(Document::new(bytes, media_type))
    }
}
