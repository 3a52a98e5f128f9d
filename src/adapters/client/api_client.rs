use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::domain::detection::DetectionResponse;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not connect to API. Is it running?")]
    Connect(#[source] reqwest::Error),
    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ClientError::Connect(e)
        } else {
            ClientError::Transport(e)
        }
    }
}

/// Cliente de la API de detección (`/health`, `/detect`).
#[derive(Clone)]
pub struct DetectApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl DetectApiClient {
    /// Acepta la URL base o la de `/detect` directamente.
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self { base_url: normalize_base_url(api_url), http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let res = self.http.get(format!("{}/health", self.base_url)).send().await?;
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ClientError::Status { status: status.as_u16(), body })
        }
    }

    pub async fn detect(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
        confidence_threshold: f32,
    ) -> Result<DetectionResponse, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(ClientError::Transport)?;
        let form = Form::new()
            .part("image", part)
            .text("confidence_threshold", confidence_threshold.to_string());

        let res = self
            .http
            .post(format!("{}/detect", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body });
        }
        parse_detection_response(&body)
    }

    pub async fn detect_file(&self, path: &Path, confidence_threshold: f32) -> Result<DetectionResponse, ClientError> {
        let content_type = content_type_for(path).ok_or_else(|| {
            ClientError::Decode(format!("{} is not a .jpg, .jpeg or .png file", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let bytes = tokio::fs::read(path).await?;
        self.detect(bytes, &file_name, content_type, confidence_threshold).await
    }
}

/// Comprueba el esquema (`detections` y `summary`) antes de deserializar.
pub fn parse_detection_response(body: &str) -> Result<DetectionResponse, ClientError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ClientError::Decode(format!("invalid JSON: {e}")))?;
    for key in ["detections", "summary"] {
        if value.get(key).is_none() {
            return Err(ClientError::Decode(format!("response has no '{key}' field")));
        }
    }
    serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

fn normalize_base_url(api_url: &str) -> String {
    let trimmed = api_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/detect").unwrap_or(trimmed).to_string()
}
