pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    let max_upload = state.max_upload_bytes;
    Router::new()
        .route("/health", get(routes::health))
        .route("/detect", post(routes::detect))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}
