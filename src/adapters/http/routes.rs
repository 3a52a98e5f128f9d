use axum::{extract::{Multipart, State}, http::StatusCode, response::IntoResponse, Json};

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{parse_threshold, ErrorResponse, HealthResponse, HealthStatus, ImageUpload};
use crate::domain::{detection::DetectionResponse, errors::DomainError};

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    match st.detection.health() {
        HealthStatus::Ready => (StatusCode::OK, Json(HealthResponse::ok())).into_response(),
        HealthStatus::Unavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse { detail: DomainError::ModelUnavailable.to_string() }),
        )
            .into_response(),
    }
}

/// `POST /detect`: campos multipart `image` (fichero) y `confidence_threshold` (texto).
pub async fn detect(
    State(st): State<HttpState>,
    mut multipart: Multipart,
) -> Result<Json<DetectionResponse>, ApiError> {
    let mut upload: Option<ImageUpload> = None;
    let mut threshold: Option<f32> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                upload = Some(ImageUpload { file_name, content_type, bytes: bytes.to_vec() });
            }
            Some("confidence_threshold") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                threshold = Some(parse_threshold(&raw)?);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| DomainError::InvalidInput("missing 'image' field".into()))?;
    let response = st.detection.handle_detect(upload, threshold).await?;
    Ok(Json(response))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(DomainError::InvalidInput(format!("malformed multipart body: {e}")))
}
