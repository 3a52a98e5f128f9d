use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Una instancia de objeto reconocida, en coordenadas de píxel de la imagen original.
///
/// `bbox` es `[x_min, y_min, x_max, y_max]` con `x_min <= x_max` y `y_min <= y_max`.
/// En JSON el campo se llama `box`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub label: String,
    pub score: f32,
}

impl Detection {
    pub fn width(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }

    /// Texto que se dibuja sobre la caja: `"{label} {score:.2}"`.
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.label, self.score)
    }
}

/// label -> número de apariciones. Sin orden garantizado.
pub type DetectionSummary = HashMap<String, usize>;

pub fn summarize_detections(detections: &[Detection]) -> DetectionSummary {
    let mut counts = HashMap::new();
    for det in detections {
        *counts.entry(det.label.clone()).or_insert(0) += 1;
    }
    counts
}

/// Contrato JSON de `POST /detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    pub summary: DetectionSummary,
}

impl From<Vec<Detection>> for DetectionResponse {
    fn from(detections: Vec<Detection>) -> Self {
        let summary = summarize_detections(&detections);
        Self { detections, summary }
    }
}
