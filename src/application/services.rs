use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{info, warn};

use crate::{
    application::{
        dto::{validate_threshold, HealthStatus, ImageUpload},
        ports::{AnnotatedImageSinkPort, AnnotatorPort, DetectorPort},
    },
    domain::{
        detection::DetectionResponse,
        errors::{DomainError, DomainResult},
        model::DetectorStatus,
    },
};

/// Caso de uso de detección: valida la subida, ejecuta el detector,
/// guarda la instantánea anotada y devuelve el JSON normalizado.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn DetectorPort>,
    annotator: Arc<dyn AnnotatorPort>,
    sink: Arc<dyn AnnotatedImageSinkPort>,
    default_threshold: f32,
}

impl DetectionService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        annotator: Arc<dyn AnnotatorPort>,
        sink: Arc<dyn AnnotatedImageSinkPort>,
        default_threshold: f32,
    ) -> Self {
        Self {
            detector,
            annotator,
            sink,
            default_threshold,
        }
    }

    pub fn health(&self) -> HealthStatus {
        match self.detector.status() {
            DetectorStatus::Ready => HealthStatus::Ready,
            DetectorStatus::Failed(reason) => HealthStatus::Unavailable(reason),
        }
    }

    /// Orden de comprobaciones: tipo MIME, umbral, estado del modelo, decodificación.
    /// Si el modelo no está listo el detector nunca se invoca.
    pub async fn handle_detect(
        &self,
        upload: ImageUpload,
        confidence_threshold: Option<f32>,
    ) -> DomainResult<DetectionResponse> {
        upload.validate_media_type()?;
        let threshold = validate_threshold(confidence_threshold.unwrap_or(self.default_threshold))?;

        if let DetectorStatus::Failed(reason) = self.detector.status() {
            warn!("Detección rechazada, modelo no disponible: {}", reason);
            return Err(DomainError::ModelUnavailable);
        }

        let image = decode_upload(&upload)?;
        let started = Instant::now();

        let detections = self.detector.detect(&image, threshold).await?;
        let infer_ms = started.elapsed().as_secs_f32() * 1000.0;

        // El render es CPU puro: fuera del runtime async.
        let annotator = self.annotator.clone();
        let to_draw = detections.clone();
        let annotated = tokio::task::spawn_blocking(move || annotator.render(&image, &to_draw))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("render task failed: {e}")))?;

        let path = self.sink.persist(annotated).await?;

        let response = DetectionResponse::from(detections);
        info!(
            "🎯 {} detecciones (umbral {:.2}, {:.1} ms) -> {}",
            response.detections.len(),
            threshold,
            infer_ms,
            path.display()
        );
        Ok(response)
    }
}

fn decode_upload(upload: &ImageUpload) -> DomainResult<DynamicImage> {
    if upload.bytes.is_empty() {
        return Err(DomainError::InvalidImage("empty upload".into()));
    }
    image::load_from_memory(&upload.bytes).map_err(|e| DomainError::InvalidImage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::Detection;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeDetector {
        status: DetectorStatus,
        detections: Vec<Detection>,
        calls: AtomicUsize,
        last_threshold: Mutex<Option<f32>>,
    }

    impl FakeDetector {
        fn ready(detections: Vec<Detection>) -> Self {
            Self {
                status: DetectorStatus::Ready,
                detections,
                calls: AtomicUsize::new(0),
                last_threshold: Mutex::new(None),
            }
        }

        fn failed() -> Self {
            Self {
                status: DetectorStatus::Failed("weights missing".into()),
                ..Self::ready(Vec::new())
            }
        }
    }

    #[async_trait]
    impl DetectorPort for FakeDetector {
        fn status(&self) -> DetectorStatus {
            self.status.clone()
        }

        async fn detect(&self, _image: &DynamicImage, threshold: f32) -> DomainResult<Vec<Detection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_threshold.lock().unwrap() = Some(threshold);
            Ok(self
                .detections
                .iter()
                .filter(|d| d.score >= threshold)
                .cloned()
                .collect())
        }
    }

    struct CountingAnnotator(AtomicUsize);

    impl AnnotatorPort for CountingAnnotator {
        fn render(&self, image: &DynamicImage, _detections: &[Detection]) -> RgbImage {
            self.0.fetch_add(1, Ordering::SeqCst);
            image.to_rgb8()
        }
    }

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<(u32, u32)>>);

    #[async_trait]
    impl AnnotatedImageSinkPort for MemorySink {
        async fn persist(&self, image: RgbImage) -> DomainResult<PathBuf> {
            self.0.lock().unwrap().push(image.dimensions());
            Ok(PathBuf::from("memory://last_annotated.jpg"))
        }
    }

    struct Fixture {
        detector: Arc<FakeDetector>,
        annotator: Arc<CountingAnnotator>,
        sink: Arc<MemorySink>,
        service: DetectionService,
    }

    fn fixture(detector: FakeDetector) -> Fixture {
        let detector = Arc::new(detector);
        let annotator = Arc::new(CountingAnnotator(AtomicUsize::new(0)));
        let sink = Arc::new(MemorySink::default());
        let service = DetectionService::new(detector.clone(), annotator.clone(), sink.clone(), 0.40);
        Fixture {
            detector,
            annotator,
            sink,
            service,
        }
    }

    fn png_upload(content_type: &str) -> ImageUpload {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(64, 48))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        ImageUpload {
            file_name: Some("test.png".into()),
            content_type: Some(content_type.into()),
            bytes,
        }
    }

    fn sample_detections() -> Vec<Detection> {
        vec![
            Detection { bbox: [1, 1, 20, 20], label: "person".into(), score: 0.91 },
            Detection { bbox: [5, 5, 40, 30], label: "dog".into(), score: 0.55 },
            Detection { bbox: [2, 3, 10, 12], label: "person".into(), score: 0.30 },
        ]
    }

    #[tokio::test]
    async fn successful_detection_persists_and_summarizes() {
        let f = fixture(FakeDetector::ready(sample_detections()));

        let response = f.service.handle_detect(png_upload("image/png"), Some(0.25)).await.unwrap();

        assert_eq!(response.detections.len(), 3);
        assert_eq!(response.summary["person"], 2);
        assert_eq!(response.summary["dog"], 1);
        assert_eq!(f.annotator.0.load(Ordering::SeqCst), 1);
        assert_eq!(f.sink.0.lock().unwrap().as_slice(), &[(64, 48)]);
    }

    #[tokio::test]
    async fn missing_threshold_uses_default() {
        let f = fixture(FakeDetector::ready(sample_detections()));

        let response = f.service.handle_detect(png_upload("image/png"), None).await.unwrap();

        assert_eq!(*f.detector.last_threshold.lock().unwrap(), Some(0.40));
        assert!(response.detections.iter().all(|d| d.score >= 0.40));
        assert_eq!(response.detections.len(), 2);
    }

    #[tokio::test]
    async fn disallowed_media_type_never_reaches_detector() {
        let f = fixture(FakeDetector::ready(sample_detections()));

        let err = f.service.handle_detect(png_upload("image/gif"), Some(0.25)).await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidMediaType(_)));
        assert_eq!(f.detector.calls.load(Ordering::SeqCst), 0);
        assert!(f.sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undecodable_bytes_are_invalid_image() {
        let f = fixture(FakeDetector::ready(sample_detections()));
        let upload = ImageUpload {
            content_type: Some("image/jpeg".into()),
            bytes: b"definitely not a jpeg".to_vec(),
            ..Default::default()
        };

        let err = f.service.handle_detect(upload, Some(0.25)).await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidImage(_)));
        assert_eq!(f.detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_upload_is_invalid_image() {
        let f = fixture(FakeDetector::ready(Vec::new()));
        let upload = ImageUpload { content_type: Some("image/png".into()), ..Default::default() };

        let err = f.service.handle_detect(upload, None).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn unavailable_model_fails_without_invoking_detector() {
        let f = fixture(FakeDetector::failed());

        let err = f.service.handle_detect(png_upload("image/png"), Some(0.25)).await.unwrap_err();

        assert!(matches!(err, DomainError::ModelUnavailable));
        assert_eq!(f.detector.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.annotator.0.load(Ordering::SeqCst), 0);
        assert_eq!(
            f.service.health(),
            HealthStatus::Unavailable("weights missing".into())
        );
    }

    #[tokio::test]
    async fn out_of_range_threshold_is_rejected() {
        let f = fixture(FakeDetector::ready(sample_detections()));

        let err = f.service.handle_detect(png_upload("image/png"), Some(1.2)).await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(f.detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summary_matches_detections_for_every_threshold() {
        let f = fixture(FakeDetector::ready(sample_detections()));

        for threshold in [0.0, 0.3, 0.5, 0.9, 1.0] {
            let response = f
                .service
                .handle_detect(png_upload("image/png"), Some(threshold))
                .await
                .unwrap();
            assert!(response.detections.iter().all(|d| d.score >= threshold));
            let total: usize = response.summary.values().sum();
            assert_eq!(total, response.detections.len());
        }
    }

    #[test]
    fn ready_detector_reports_healthy() {
        let f = fixture(FakeDetector::ready(Vec::new()));
        assert_eq!(f.service.health(), HealthStatus::Ready);
    }
}
