mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use image::ImageFormat;

use common::{app, image_bytes, one_dog, ScriptedDetector};
use yolo_detect_api::adapters::client::api_client::{ClientError, DetectApiClient};

async fn spawn_server(detector: Arc<ScriptedDetector>, output_dir: &std::path::Path) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(detector, output_dir);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn client_uploads_and_receives_detections() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = spawn_server(Arc::new(ScriptedDetector::ready(one_dog())), tmp.path()).await;
    let client = DetectApiClient::new(&format!("http://{addr}/detect")).unwrap();

    client.health().await.unwrap();
    let response = client
        .detect(image_bytes(128, 96, ImageFormat::Jpeg), "test_image.jpg", "image/jpeg", 0.25)
        .await
        .unwrap();

    assert_eq!(response.detections.len(), 1);
    assert_eq!(response.summary["dog"], 1);
    assert!(tmp.path().join("last_annotated.jpg").exists());
}

#[tokio::test]
async fn client_reads_files_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = spawn_server(Arc::new(ScriptedDetector::ready(one_dog())), tmp.path()).await;
    let client = DetectApiClient::new(&format!("http://{addr}")).unwrap();

    let image_path = tmp.path().join("input.png");
    std::fs::write(&image_path, image_bytes(64, 64, ImageFormat::Png)).unwrap();

    let response = client.detect_file(&image_path, 0.25).await.unwrap();
    assert_eq!(response.detections[0].label, "dog");
}

#[tokio::test]
async fn client_surfaces_http_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let addr = spawn_server(Arc::new(ScriptedDetector::failed()), tmp.path()).await;
    let client = DetectApiClient::new(&format!("http://{addr}")).unwrap();

    match client.health().await {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert!(body.contains("Model not loaded"));
        }
        other => panic!("expected 503, got {other:?}"),
    }

    let err = client
        .detect(image_bytes(16, 16, ImageFormat::Png), "a.png", "image/png", 0.25)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Error 503:"), "{err}");
}

#[tokio::test]
async fn client_rejects_unsupported_extensions_locally() {
    let tmp = tempfile::tempdir().unwrap();
    let client = DetectApiClient::new("http://127.0.0.1:9").unwrap();
    let gif = tmp.path().join("x.gif");
    std::fs::write(&gif, b"GIF89a").unwrap();

    assert!(matches!(client.detect_file(&gif, 0.25).await, Err(ClientError::Decode(_))));
}
