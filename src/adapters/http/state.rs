use std::sync::Arc;
use crate::application::services::DetectionService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Validación, inferencia, instantánea anotada y resumen.
    pub detection: Arc<DetectionService>,
    /// Límite del cuerpo multipart en bytes.
    pub max_upload_bytes: usize,
}

impl HttpState {
    pub fn new(detection: Arc<DetectionService>, max_upload_bytes: usize) -> Self {
        Self { detection, max_upload_bytes }
    }
}
