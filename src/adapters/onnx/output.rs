//! Decodificación de la salida cruda de YOLO y normalización al contrato `Detection`.
//!
//! Según cómo se exportó el modelo, la salida llega en una de dos formas:
//! una lista de cajas ya filtradas (`Boxes`, estilo Ultralytics) o una tabla con
//! una fila por candidato (`Table`, estilo YOLOv5 hub) que aún requiere el filtro
//! por umbral. `normalize` es el único punto donde ambas se convierten en `Detection`;
//! ninguna forma cruda sale de este adaptador.

use ndarray::{s, ArrayView2};
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::onnx::preprocess::FrameGeometry;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::YoloParams,
};

/// Umbral fijo con el que el modelo hub filtra antes de construir su tabla.
pub const HUB_BASE_CONFIDENCE: f32 = 0.25;

/// Tensor de salida copiado fuera de la sesión ONNX.
#[derive(Debug, Clone)]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, 4 + nc, N]`: cx, cy, w, h y una puntuación por clase (YOLOv8/11).
    ChannelsFirst { classes: usize },
    /// `[1, N, 6]`: x1, y1, x2, y2, score, class (exportaciones sin NMS).
    EndToEnd,
    /// `[1, N, 5 + nc]`: cx, cy, w, h, objectness y puntuaciones por clase (YOLOv5).
    Hub { classes: usize },
}

/// Forma de lista de objetos: tensores paralelos por caja.
#[derive(Debug, Clone)]
pub struct BoxesResult {
    pub xyxy: Vec<[f32; 4]>,
    pub conf: Vec<f32>,
    pub cls: Vec<usize>,
    pub names: Arc<[String]>,
}

/// Forma tabular: una fila por detección.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub confidence: f32,
    pub class: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum RawDetections {
    Boxes(BoxesResult),
    Table(Vec<TableRow>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    bbox: [f32; 4],
    score: f32,
    class_id: usize,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let x1 = self.bbox[0].max(other.bbox[0]);
        let y1 = self.bbox[1].max(other.bbox[1]);
        let x2 = self.bbox[2].min(other.bbox[2]);
        let y2 = self.bbox[3].min(other.bbox[3]);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

pub fn classify_layout(shape: &[usize], num_labels: usize) -> DomainResult<OutputLayout> {
    let [1, a, b] = *shape else {
        return Err(unexpected(format!("unsupported output tensor shape {shape:?}")));
    };

    let layout = if b == 6 && a > b && num_labels != 1 {
        OutputLayout::EndToEnd
    } else if a > 4 && a < b {
        OutputLayout::ChannelsFirst { classes: a - 4 }
    } else if b > 5 && b < a {
        OutputLayout::Hub { classes: b - 5 }
    } else {
        return Err(unexpected(format!("unsupported output tensor shape {shape:?}")));
    };

    match layout {
        OutputLayout::ChannelsFirst { classes } | OutputLayout::Hub { classes } if classes != num_labels => {
            Err(unexpected(format!(
                "model reports {classes} classes but {num_labels} labels are configured"
            )))
        }
        _ => Ok(layout),
    }
}

/// Decodifica el tensor según su layout, aplicando NMS y `max_detections`.
pub fn decode(
    raw: &RawTensor,
    labels: &Arc<[String]>,
    geometry: &FrameGeometry,
    threshold: f32,
    params: &YoloParams,
) -> DomainResult<RawDetections> {
    let layout = classify_layout(&raw.shape, labels.len())?;
    let (rows, cols) = (raw.shape[1], raw.shape[2]);
    let view = ArrayView2::from_shape((rows, cols), raw.data.as_slice())
        .map_err(|e| unexpected(format!("output data does not match shape {:?}: {e}", raw.shape)))?;

    match layout {
        OutputLayout::ChannelsFirst { .. } => {
            let mut candidates = Vec::new();
            for i in 0..cols {
                let Some((class_id, score)) = best_class(view.slice(s![4.., i]).iter()) else {
                    continue;
                };
                if score >= threshold {
                    let bbox = cxcywh_to_xyxy(view[[0, i]], view[[1, i]], view[[2, i]], view[[3, i]], geometry);
                    candidates.push(Candidate { bbox, score, class_id });
                }
            }
            let kept = nms(candidates, params.iou_threshold, params.max_detections);
            Ok(RawDetections::Boxes(into_boxes(kept, labels)))
        }
        OutputLayout::EndToEnd => {
            let mut kept = Vec::new();
            for row in view.rows() {
                let score = row[4];
                if !(score >= threshold) {
                    continue;
                }
                let class = row[5];
                if !class.is_finite() || class < 0.0 {
                    return Err(unexpected(format!("invalid class index {class}")));
                }
                let bbox = [
                    row[0] * geometry.scale_x,
                    row[1] * geometry.scale_y,
                    row[2] * geometry.scale_x,
                    row[3] * geometry.scale_y,
                ];
                kept.push(Candidate { bbox, score, class_id: class as usize });
            }
            kept.sort_by(|a, b| b.score.total_cmp(&a.score));
            kept.truncate(params.max_detections);
            Ok(RawDetections::Boxes(into_boxes(kept, labels)))
        }
        OutputLayout::Hub { .. } => {
            let floor = threshold.min(HUB_BASE_CONFIDENCE);
            let mut candidates = Vec::new();
            for row in view.rows() {
                let objectness = row[4];
                let Some((class_id, class_score)) = best_class(row.slice(s![5..]).iter()) else {
                    continue;
                };
                let score = objectness * class_score;
                if score >= floor {
                    let bbox = cxcywh_to_xyxy(row[0], row[1], row[2], row[3], geometry);
                    candidates.push(Candidate { bbox, score, class_id });
                }
            }
            let kept = nms(candidates, params.iou_threshold, params.max_detections);
            let table = kept
                .into_iter()
                .map(|c| TableRow {
                    xmin: c.bbox[0],
                    ymin: c.bbox[1],
                    xmax: c.bbox[2],
                    ymax: c.bbox[3],
                    confidence: c.score,
                    class: c.class_id,
                    name: labels.get(c.class_id).cloned().unwrap_or_default(),
                })
                .collect();
            Ok(RawDetections::Table(table))
        }
    }
}

/// Convierte cualquier forma cruda en la lista canónica, en el mismo orden.
///
/// Filtra `score >= threshold` (la forma tabular lo necesita; la de cajas ya
/// viene filtrada), recorta a los límites de la imagen y trunca a enteros.
pub fn normalize(raw: RawDetections, threshold: f32, width: u32, height: u32) -> DomainResult<Vec<Detection>> {
    match raw {
        RawDetections::Boxes(boxes) => {
            let n = boxes.xyxy.len();
            if boxes.conf.len() != n || boxes.cls.len() != n {
                return Err(unexpected(format!(
                    "box tensors disagree in length: xyxy={n} conf={} cls={}",
                    boxes.conf.len(),
                    boxes.cls.len()
                )));
            }

            let mut detections = Vec::with_capacity(n);
            for ((xyxy, &score), &cls) in boxes.xyxy.iter().zip(&boxes.conf).zip(&boxes.cls) {
                if !score.is_finite() || score < threshold {
                    continue;
                }
                let label = boxes
                    .names
                    .get(cls)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| unexpected(format!("class id {cls} has no label")))?;
                detections.push(to_detection(*xyxy, label.clone(), score, width, height));
            }
            Ok(detections)
        }
        RawDetections::Table(rows) => {
            let mut detections = Vec::with_capacity(rows.len());
            for row in rows {
                if !row.confidence.is_finite() || row.confidence < threshold {
                    continue;
                }
                if row.name.is_empty() {
                    return Err(unexpected(format!("row for class {} has no name", row.class)));
                }
                let xyxy = [row.xmin, row.ymin, row.xmax, row.ymax];
                detections.push(to_detection(xyxy, row.name, row.confidence, width, height));
            }
            Ok(detections)
        }
    }
}

fn to_detection(xyxy: [f32; 4], label: String, score: f32, width: u32, height: u32) -> Detection {
    let clamp = |v: f32, max: u32| v.clamp(0.0, max as f32) as i32;
    let (xa, xb) = (clamp(xyxy[0], width), clamp(xyxy[2], width));
    let (ya, yb) = (clamp(xyxy[1], height), clamp(xyxy[3], height));

    Detection {
        bbox: [xa.min(xb), ya.min(yb), xa.max(xb), ya.max(yb)],
        label,
        score: score.clamp(0.0, 1.0),
    }
}

fn best_class<'a>(scores: impl Iterator<Item = &'a f32>) -> Option<(usize, f32)> {
    scores
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32, g: &FrameGeometry) -> [f32; 4] {
    [
        (cx - w / 2.0) * g.scale_x,
        (cy - h / 2.0) * g.scale_y,
        (cx + w / 2.0) * g.scale_x,
        (cy + h / 2.0) * g.scale_y,
    ]
}

/// NMS por clase; el resultado queda ordenado por puntuación descendente.
fn nms(candidates: Vec<Candidate>, iou_threshold: f32, max_detections: usize) -> Vec<Candidate> {
    let mut by_class: HashMap<usize, Vec<Candidate>> = HashMap::new();
    for c in candidates {
        by_class.entry(c.class_id).or_default().push(c);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            kept.push(group[i]);
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].iou(&group[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept.truncate(max_detections);
    kept
}

fn into_boxes(kept: Vec<Candidate>, labels: &Arc<[String]>) -> BoxesResult {
    BoxesResult {
        xyxy: kept.iter().map(|c| c.bbox).collect(),
        conf: kept.iter().map(|c| c.score).collect(),
        cls: kept.iter().map(|c| c.class_id).collect(),
        names: labels.clone(),
    }
}

fn unexpected(msg: String) -> DomainError {
    DomainError::UnexpectedOutputFormat(msg)
}
