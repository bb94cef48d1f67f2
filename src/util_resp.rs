use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::TabError;

pub type StandardResponse<T> = Result<Json<Data<T>>, TabError>;

/// Every successful response body is wrapped as `{"data": ...}`.
#[derive(Serialize, Debug)]
pub struct Data<T> {
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> StandardResponse<T> {
    Ok(Json(Data { data }))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for TabError {
    fn into_response(self) -> Response {
        let status = match &self {
            TabError::NotFound { .. } => StatusCode::NOT_FOUND,
            TabError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TabError::Conflict(_) => StatusCode::CONFLICT,
            TabError::StorageFailure { .. } => {
                tracing::error!(error = %self, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
