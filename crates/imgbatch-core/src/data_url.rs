//! Transport-safe encoding of binary payloads
//!
//! Images travel to and from the remote optimizer as `data:` URLs: a single
//! text string carrying the declared content type and a base64 payload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub content_type: String,
    pub bytes: Bytes,
}

impl DataUrl {
    pub fn new(content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Encode bytes as `data:<content_type>;base64,<payload>`
    pub fn encode(content_type: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
    }

    pub fn to_data_url(&self) -> String {
        Self::encode(&self.content_type, &self.bytes)
    }

    /// Parse a `data:` URL back into its content type and exact bytes
    pub fn decode(value: &str) -> AppResult<Self> {
        let rest = value
            .strip_prefix("data:")
            .ok_or_else(|| AppError::MalformedResponse("missing data: prefix".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::MalformedResponse("missing payload separator".to_string()))?;

        let content_type = header.strip_suffix(";base64").ok_or_else(|| {
            AppError::MalformedResponse(format!("unsupported data URL header: {}", header))
        })?;

        // Parameters such as `;charset=` may precede the encoding marker
        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let bytes = STANDARD.decode(payload.trim())?;

        Ok(Self {
            content_type,
            bytes: Bytes::from(bytes),
        })
    }
}
