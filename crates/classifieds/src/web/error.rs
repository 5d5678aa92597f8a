use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::views::ErrorView;
use crate::session::{Flash, FlashLevel};

/// Failure that aborts a request with a server error page
#[derive(Error, Debug)]
#[error("{source}")]
pub struct AppError {
    /// Notice shown to the user
    message: &'static str,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl AppError {
    pub fn new(
        message: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message,
            source: source.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self.source);

        let view = ErrorView {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            flashes: vec![Flash::new(FlashLevel::Error, self.message)],
            logos: Vec::new(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(view)).into_response()
    }
}
