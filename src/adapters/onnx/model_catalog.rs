use async_trait::async_trait;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

#[derive(Default)]
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.as_os_str().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        if model.onnx_path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            return Err(DomainError::InvalidInput(format!(
                "model file is not an .onnx export: {}",
                model.onnx_path.display()
            )));
        }
        if !tokio::fs::try_exists(&model.onnx_path).await.unwrap_or(false) {
            return Err(DomainError::InvalidInput(format!(
                "model file not found: {}",
                model.onnx_path.display()
            )));
        }
        Ok(())
    }
}
