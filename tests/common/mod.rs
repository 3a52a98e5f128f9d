#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use yolo_detect_api::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{
            labels::load_labels,
            output::{self, RawTensor},
            preprocess,
        },
        render::{
            annotate::{AnnotationRenderer, AnnotationStyle},
            font::{LabelFont, DEFAULT_FONT_SIZE},
        },
        storage::annotated_file::LastAnnotatedFile,
    },
    application::{ports::DetectorPort, services::DetectionService},
    domain::{
        detection::Detection,
        errors::{DomainError, DomainResult},
        model::{DetectorStatus, YoloParams},
    },
};

pub const INPUT_SIZE: u32 = 64;
pub const DOG: usize = 16;
pub const CAT: usize = 15;

/// Detector sin ONNX: devuelve un tensor fijo y lo pasa por la decodificación real.
pub struct ScriptedDetector {
    status: DetectorStatus,
    raw: RawTensor,
    labels: Arc<[String]>,
    params: YoloParams,
    pub calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn ready(raw: RawTensor) -> Self {
        Self {
            status: DetectorStatus::Ready,
            raw,
            labels: load_labels(None).unwrap().into(),
            params: YoloParams { input_size: INPUT_SIZE, ..YoloParams::default() },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failed() -> Self {
        Self { status: DetectorStatus::Failed("weights missing".into()), ..Self::ready(one_dog()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectorPort for ScriptedDetector {
    fn status(&self) -> DetectorStatus {
        self.status.clone()
    }

    async fn detect(&self, image: &DynamicImage, threshold: f32) -> DomainResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.status.is_ready() {
            return Err(DomainError::ModelUnavailable);
        }
        let geometry = preprocess::prepare(image, self.params.input_size).geometry;
        let decoded = output::decode(&self.raw, &self.labels, &geometry, threshold, &self.params)?;
        output::normalize(decoded, threshold, geometry.width, geometry.height)
    }
}

/// Salida `[1, 84, 8]` con los candidatos dados en coordenadas de entrada (64x64).
pub fn channels_first(cands: &[([f32; 4], usize, f32)]) -> RawTensor {
    let (rows, n) = (84, 8);
    let mut data = vec![0.0; rows * n];
    for (i, (cxcywh, class, score)) in cands.iter().enumerate() {
        for (r, v) in cxcywh.iter().enumerate() {
            data[r * n + i] = *v;
        }
        data[(4 + class) * n + i] = *score;
    }
    RawTensor { shape: vec![1, rows, n], data }
}

pub fn one_dog() -> RawTensor {
    channels_first(&[([32.0, 32.0, 16.0, 16.0], DOG, 0.9)])
}

pub fn dog_and_weak_cat() -> RawTensor {
    channels_first(&[
        ([16.0, 16.0, 8.0, 8.0], DOG, 0.9),
        ([48.0, 48.0, 8.0, 8.0], CAT, 0.3),
    ])
}

pub fn app(detector: Arc<ScriptedDetector>, output_dir: &Path) -> Router {
    let renderer = AnnotationRenderer::new(LabelFont::builtin(DEFAULT_FONT_SIZE), AnnotationStyle::server());
    let service = DetectionService::new(
        detector,
        Arc::new(renderer),
        Arc::new(LastAnnotatedFile::new(output_dir)),
        0.40,
    );
    router(HttpState::new(Arc::new(service), 20 * 1024 * 1024))
}

pub fn image_bytes(w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

pub struct FormPart<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self { name, file_name: Some(file_name), content_type: Some(content_type), data }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self { name, file_name: None, content_type: None, data: value.as_bytes() }
    }
}

const BOUNDARY: &str = "yolo-detect-test-boundary";

/// Devuelve `(content-type, cuerpo)` de un formulario multipart.
pub fn multipart(parts: &[FormPart]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
