use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use std::path::PathBuf;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    model::{DetectorStatus, ModelId},
};

/// Frontera con el modelo preentrenado. Nunca expone la forma cruda de su salida.
#[async_trait]
pub trait DetectorPort: Send + Sync {
    fn status(&self) -> DetectorStatus;
    async fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> DomainResult<Vec<Detection>>;
}

pub trait AnnotatorPort: Send + Sync {
    /// Devuelve una copia nueva; `image` no se modifica.
    fn render(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage;
}

#[async_trait]
pub trait AnnotatedImageSinkPort: Send + Sync {
    async fn persist(&self, image: RgbImage) -> DomainResult<PathBuf>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
