use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8n"
    pub onnx_path: PathBuf, // filesystem path
}

impl ModelId {
    pub fn from_path(onnx_path: impl Into<PathBuf>) -> Self {
        let onnx_path = onnx_path.into();
        let name = onnx_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());
        Self { name, onnx_path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // default per-request threshold, 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.40,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Estado del detector: se decide una sola vez al arrancar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorStatus {
    Ready,
    Failed(String),
}

impl DetectorStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DetectorStatus::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_comes_from_file_stem() {
        let id = ModelId::from_path("/app/models/yolov8n.onnx");
        assert_eq!(id.name, "yolov8n");
        assert_eq!(id.onnx_path, PathBuf::from("/app/models/yolov8n.onnx"));
    }

    #[test]
    fn only_ready_status_is_ready() {
        assert!(DetectorStatus::Ready.is_ready());
        assert!(!DetectorStatus::Failed("missing weights".into()).is_ready());
    }
}
