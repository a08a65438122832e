use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use service::errors::ServiceError;

/// Error response carrying an HTTP status and a `{"error": ...}` JSON body.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: &'static str,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &'static str, detail: Option<String>) -> Self {
        Self { status, title, detail }
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", Some(format!("{} not found", entity)))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let msg = self.detail.unwrap_or_else(|| self.title.to_string());
        (self.status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let (status, title) = match &e {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            ServiceError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        Self::new(status, title, Some(e.to_string()))
    }
}
