//! Data URLs for uploaded images.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DataUrlError {
    #[error("Not a data URL")]
    NotDataUrl,

    #[error("Unsupported file type '{0}', expected an image")]
    NotImage(String),

    #[error("Data URL is not base64 encoded")]
    NotBase64,

    #[error("Image file is empty")]
    Empty,
}

/// A base64 data URL holding one image, e.g. `data:image/png;base64,iVBOR...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    url: String,
    mime_len: usize,
}

impl ImagePayload {
    /// Encode raw file bytes. `mime` is the type the browser reported.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self, DataUrlError> {
        let mime = mime.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            return Err(DataUrlError::NotImage(mime));
        }
        if bytes.is_empty() {
            return Err(DataUrlError::Empty);
        }
        let url = format!("data:{};base64,{}", mime, STANDARD.encode(bytes));
        Ok(Self {
            mime_len: mime.len(),
            url,
        })
    }

    /// Validate an existing data URL, such as the cached copy of the last upload.
    pub fn parse(url: &str) -> Result<Self, DataUrlError> {
        let rest = url.strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUrlError::NotBase64)?;
        if !mime.to_ascii_lowercase().starts_with("image/") {
            return Err(DataUrlError::NotImage(mime.to_string()));
        }
        if payload.is_empty() {
            return Err(DataUrlError::Empty);
        }
        Ok(Self {
            mime_len: mime.len(),
            url: url.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.url["data:".len().."data:".len() + self.mime_len]
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn into_string(self) -> String {
        self.url
    }

    /// Decoded size of the image in bytes.
    pub fn decoded_len(&self) -> usize {
        let payload = self.url.split_once(',').map(|(_, p)| p).unwrap_or("");
        let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
        ((payload.len() / 4) * 3).saturating_sub(padding.min(2))
    }
}

impl fmt::Display for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} image ({} bytes)", self.mime_type(), self.decoded_len())
    }
}
