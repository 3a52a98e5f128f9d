use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::application::ports::AnnotatedImageSinkPort;
use crate::domain::errors::{DomainError, DomainResult};

pub const ANNOTATED_FILE_NAME: &str = "last_annotated.jpg";

/// Única ranura de depuración en disco: cada detección correcta la sobrescribe.
///
/// No hay bloqueo entre peticiones concurrentes; gana la última escritura y el
/// contenido no tiene por qué corresponder a una petición concreta.
#[derive(Debug, Clone)]
pub struct LastAnnotatedFile {
    output_dir: PathBuf,
}

impl LastAnnotatedFile {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(ANNOTATED_FILE_NAME)
    }
}

fn write_jpeg(dir: &Path, path: &Path, image: &RgbImage) -> DomainResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| DomainError::OperationFailed(format!("creating {}: {e}", dir.display())))?;
    image
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|e| DomainError::OperationFailed(format!("writing {}: {e}", path.display())))
}

#[async_trait]
impl AnnotatedImageSinkPort for LastAnnotatedFile {
    async fn persist(&self, image: RgbImage) -> DomainResult<PathBuf> {
        let dir = self.output_dir.clone();
        let path = self.path();

        let written = path.clone();
        tokio::task::spawn_blocking(move || write_jpeg(&dir, &written, &image))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("persist task failed: {e}")))??;

        debug!("Imagen anotada guardada en {}", path.display());
        Ok(path)
    }
}
