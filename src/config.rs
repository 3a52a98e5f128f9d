use anyhow::{ensure, Result};
use clap::{Args, Parser};
use std::path::PathBuf;

use crate::domain::model::{ModelId, YoloParams};

/// Configuración del servidor: flags o variables de entorno.
#[derive(Debug, Clone, Parser)]
#[command(name = "yolo-detect-api", version, about = "YOLO object detection over HTTP")]
pub struct ServerConfig {
    /// ONNX export of the detector
    #[arg(long, env = "MODEL_PATH", default_value = "models/yolov8n.onnx")]
    pub model_path: PathBuf,

    /// Class names, one per line (COCO-80 when absent)
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Directory holding last_annotated.jpg
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    /// Threshold used when a request omits confidence_threshold
    #[arg(long, env = "DEFAULT_CONFIDENCE", default_value_t = 0.40)]
    pub default_confidence: f32,

    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.45)]
    pub iou_threshold: f32,

    #[arg(long, env = "INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// TrueType font for labels (system fonts, then a built-in bitmap font, otherwise)
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Browser UI assets
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.default_confidence),
            "default confidence must be within [0, 1], got {}",
            self.default_confidence
        );
        ensure!(
            (0.0..=1.0).contains(&self.iou_threshold),
            "IoU threshold must be within [0, 1], got {}",
            self.iou_threshold
        );
        ensure!(self.input_size > 0, "input size must be positive");
        ensure!(self.max_detections > 0, "max detections must be positive");
        Ok(())
    }

    pub fn model_id(&self) -> ModelId {
        ModelId::from_path(&self.model_path)
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            conf_threshold: self.default_confidence,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}

/// Opciones comunes del cliente.
#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the detection API (a URL ending in /detect is accepted too)
    #[arg(long, env = "API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// TrueType font for labels
    #[arg(long, env = "FONT_PATH")]
    pub font_path: Option<PathBuf>,
}
