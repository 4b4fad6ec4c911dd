use bytes::Bytes;
use std::path::Path;

use crate::error::ScanError;

/// A user-selected label image, held in memory until it is uploaded or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<Self, ScanError> {
        let file_name = file_name.into();
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(ScanError::NotAnImage(file_name));
        }
        Ok(Self {
            file_name,
            mime_type,
            bytes: bytes.into(),
        })
    }

    pub async fn open(path: &Path) -> Result<Self, ScanError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_for_extension)
            .ok_or_else(|| ScanError::NotAnImage(file_name.clone()))?;

        let data = tokio::fs::read(path).await?;
        log::debug!("Read {} ({} bytes, {})", file_name, data.len(), mime_type);
        Self::new(file_name, mime_type, data)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn check_size(&self, limit: usize) -> Result<(), ScanError> {
        if self.len() > limit {
            return Err(ScanError::ImageTooLarge {
                size: self.len(),
                limit,
            });
        }
        Ok(())
    }
}

pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
