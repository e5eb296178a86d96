//! HTTP API surface.

pub mod routes;
pub mod schemas;
pub mod server;

pub use server::{build_router, serve, AppState};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::AppError;
use schemas::ApiErrorResponse;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ChatNotFound(_) | AppError::LinkNotFound(_) => StatusCode::NOT_FOUND,
            AppError::LinkAlreadyTracked(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiErrorResponse {
            description: self.to_string(),
            code: status.as_u16().to_string(),
            exception_name: self.kind().to_string(),
            exception_message: self.to_string(),
            stacktrace: Vec::new(),
        };

        (status, Json(body)).into_response()
    }
}
