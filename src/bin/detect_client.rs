//! Cliente de la API de detección: sube una imagen, muestra el resumen y dibuja
//! las cajas localmente con el mismo renderer que el servidor.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use yolo_detect_api::{
    adapters::{
        client::api_client::{ClientError, DetectApiClient},
        render::{
            annotate::{AnnotationRenderer, AnnotationStyle},
            font::{LabelFont, DEFAULT_FONT_SIZE},
        },
    },
    application::ports::AnnotatorPort,
    config::ClientConfig,
    domain::detection::DetectionResponse,
};

#[derive(Debug, Parser)]
#[command(name = "detect-client", version, about = "Client for the YOLO detection API")]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload an image, print the detections and save a locally annotated copy
    Detect {
        image: PathBuf,
        #[arg(short, long, default_value_t = 0.25)]
        confidence: f32,
        #[arg(short, long, default_value = "annotated.jpg")]
        output: PathBuf,
    },
    /// Wait for /health, run one detection and check the server's output file
    Smoke {
        image: PathBuf,
        #[arg(long, default_value = "output/last_annotated.jpg")]
        output_file: PathBuf,
        #[arg(long, default_value_t = 30)]
        attempts: u32,
        #[arg(long, default_value_t = 2)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Detect { image, confidence, output } => {
            run_detect(&cli.config, image, *confidence, output).await
        }
        Command::Smoke { image, output_file, attempts, interval_secs } => {
            run_smoke(&cli.config, image, output_file, *attempts, Duration::from_secs(*interval_secs)).await
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_detect(config: &ClientConfig, image: &Path, confidence: f32, output: &Path) -> Result<bool> {
    let client = DetectApiClient::new(&config.api_url)?;
    let response = match client.detect_file(image, confidence).await {
        Ok(r) => r,
        Err(e @ (ClientError::Connect(_) | ClientError::Status { .. })) => {
            error!("{}", e);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    info!("✅ Detection complete!");
    print_summary(&response);

    let source = image::open(image).with_context(|| format!("decoding {}", image.display()))?;
    let font = LabelFont::load(config.font_path.as_deref(), DEFAULT_FONT_SIZE);
    let renderer = AnnotationRenderer::new(font, AnnotationStyle::client());
    let annotated = renderer.render(&source, &response.detections);
    annotated
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    if response.detections.is_empty() {
        info!("No objects detected; {} is the unannotated image", output.display());
    } else {
        info!("🖼️ Annotated image written to {}", output.display());
    }
    Ok(true)
}

fn print_summary(response: &DetectionResponse) {
    println!("Summary");
    if response.summary.is_empty() {
        println!("No objects detected.");
    } else {
        let mut labels: Vec<_> = response.summary.iter().collect();
        labels.sort();
        for (label, count) in labels {
            println!("- {label}: {count}");
        }
    }
    println!("Detailed Detections");
    match serde_json::to_string_pretty(&response.detections) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("could not format detections: {}", e),
    }
}

async fn run_smoke(
    config: &ClientConfig,
    image: &Path,
    output_file: &Path,
    attempts: u32,
    interval: Duration,
) -> Result<bool> {
    let client = DetectApiClient::new(&config.api_url)?;

    info!("Waiting for API health at {}...", client.base_url());
    let mut healthy = false;
    for _ in 0..attempts {
        if client.health().await.is_ok() {
            healthy = true;
            break;
        }
        tokio::time::sleep(interval).await;
    }
    if !healthy {
        error!("API failed to become healthy.");
        return Ok(false);
    }
    info!("API is healthy!");

    info!("Testing detection with {}...", image.display());
    let response = match client.detect_file(image, 0.25).await {
        Ok(r) => r,
        Err(e) => {
            error!("Detection failed: {}", e);
            return Ok(false);
        }
    };
    info!("Response schema valid.");
    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.detections.is_empty() {
        warn!("No objects detected (unexpected for this image).");
    } else {
        info!("Detected objects: {:?}", response.summary);
    }

    if !tokio::fs::try_exists(output_file).await.unwrap_or(false) {
        error!("Output file missing: {}", output_file.display());
        return Ok(false);
    }
    info!("Output file exists. ALL TESTS PASSED");
    Ok(true)
}
