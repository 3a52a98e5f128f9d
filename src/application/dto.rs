use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Fichero recibido en el campo `image` del formulario multipart.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Tipo MIME sin parámetros y en minúsculas (`"image/PNG; q=1"` -> `"image/png"`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
    }

    pub fn validate_media_type(&self) -> DomainResult<()> {
        match self.media_type() {
            Some(ct) if ALLOWED_CONTENT_TYPES.contains(&ct.as_str()) => Ok(()),
            Some(ct) => Err(DomainError::InvalidMediaType(ct)),
            None => Err(DomainError::InvalidMediaType("unknown".into())),
        }
    }
}

pub fn validate_threshold(value: f32) -> DomainResult<f32> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::InvalidInput(format!(
            "confidence_threshold must be within [0, 1], got {value}"
        )))
    }
}

pub fn parse_threshold(raw: &str) -> DomainResult<f32> {
    let value = raw.trim().parse::<f32>().map_err(|_| {
        DomainError::InvalidInput(format!("confidence_threshold is not a number: {raw:?}"))
    })?;
    validate_threshold(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }
}

/// Cuerpo de error JSON: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
