use anyhow::anyhow;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::adapters::onnx::{output, preprocess, yolo_engine::OnnxYoloEngine};
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::{DetectorStatus, ModelId, YoloParams},
};

enum EngineState {
    /// Una sola inferencia a la vez: la sesión exige acceso exclusivo.
    Ready(Arc<Mutex<OnnxYoloEngine>>),
    Failed(String),
}

/// Adaptador del detector: se construye una vez al arrancar y no se recarga.
pub struct OnnxDetector {
    state: EngineState,
    labels: Arc<[String]>,
    params: YoloParams,
}

impl OnnxDetector {
    /// Nunca falla: si el modelo no carga, el detector queda en estado `Failed`.
    pub fn load(model: &ModelId, labels: Vec<String>, params: YoloParams, intra_threads: usize) -> Self {
        let state = match OnnxYoloEngine::load(&model.onnx_path, intra_threads) {
            Ok(engine) => {
                info!("✅ Modelo {} cargado desde {}", model.name, model.onnx_path.display());
                EngineState::Ready(Arc::new(Mutex::new(engine)))
            }
            Err(e) => {
                error!("❌ Error cargando modelo YOLO {}: {:#}", model.onnx_path.display(), e);
                EngineState::Failed(format!("{e:#}"))
            }
        };
        Self { state, labels: labels.into(), params }
    }

    pub fn unavailable(reason: impl Into<String>, labels: Vec<String>, params: YoloParams) -> Self {
        Self {
            state: EngineState::Failed(reason.into()),
            labels: labels.into(),
            params,
        }
    }
}

#[async_trait]
impl DetectorPort for OnnxDetector {
    fn status(&self) -> DetectorStatus {
        match &self.state {
            EngineState::Ready(_) => DetectorStatus::Ready,
            EngineState::Failed(reason) => DetectorStatus::Failed(reason.clone()),
        }
    }

    async fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> DomainResult<Vec<Detection>> {
        let EngineState::Ready(engine) = &self.state else {
            return Err(DomainError::ModelUnavailable);
        };

        let prepared = preprocess::prepare(image, self.params.input_size);
        let geometry = prepared.geometry;
        let tensor = prepared.tensor;
        let engine = engine.clone();

        let raw = tokio::task::spawn_blocking(move || {
            let mut engine = engine.lock().map_err(|_| anyhow!("inference lock poisoned"))?;
            engine.run(tensor)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("inference task failed: {e}")))?
        .map_err(|e| DomainError::OperationFailed(format!("inference failed: {e:#}")))?;

        let decoded = output::decode(&raw, &self.labels, &geometry, confidence_threshold, &self.params)?;
        output::normalize(decoded, confidence_threshold, geometry.width, geometry.height)
    }
}
