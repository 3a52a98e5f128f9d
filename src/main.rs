use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use yolo_detect_api::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{detector::OnnxDetector, labels::load_labels, model_catalog::OnnxModelCatalog},
        render::{
            annotate::{AnnotationRenderer, AnnotationStyle},
            font::{LabelFont, DEFAULT_FONT_SIZE},
        },
        storage::annotated_file::LastAnnotatedFile,
    },
    application::{ports::ModelCatalogPort, services::DetectionService},
    config::ServerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();
    config.validate()?;

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 2. Cargar el modelo una sola vez. Si falla, el proceso sigue vivo pero no sano.
    let labels = load_labels(config.labels_path.as_deref())?;
    let model = config.model_id();
    tracing::info!("Cargando modelo {} desde {}", model.name, model.onnx_path.display());

    let detector = match OnnxModelCatalog::new().validate_model(&model).await {
        Ok(()) => OnnxDetector::load(&model, labels, config.yolo_params(), config.intra_threads),
        Err(e) => {
            tracing::error!("❌ Modelo no disponible: {}", e);
            OnnxDetector::unavailable(e.to_string(), labels, config.yolo_params())
        }
    };

    // 3. Render y ranura de salida
    let font = LabelFont::load(config.font_path.as_deref(), DEFAULT_FONT_SIZE);
    if font.is_builtin() {
        tracing::warn!("Sin fuente TrueType: las etiquetas usarán la fuente bitmap embebida");
    }
    let renderer = AnnotationRenderer::new(font, AnnotationStyle::server());
    let sink = LastAnnotatedFile::new(&config.output_dir);
    tracing::info!("📂 Imagen anotada en {}", sink.path().display());

    // 4. Caso de uso y estado de la API
    let detection = Arc::new(DetectionService::new(
        Arc::new(detector),
        Arc::new(renderer),
        Arc::new(sink),
        config.default_confidence,
    ));
    let state = HttpState::new(detection, config.max_upload_bytes);

    // 5. Router de Axum y archivos estáticos (UI del navegador)
    let app = router(state).fallback_service(ServeDir::new(&config.static_dir));

    // 6. Lanzar el servidor
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    tracing::info!("🚀 API de detección iniciada en http://{}", config.bind_addr);
    tracing::info!("📂 Archivos estáticos servidos desde {}", config.static_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("No se pudo instalar el manejador de Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
