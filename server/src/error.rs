use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::database::DatabaseError;
use crate::weather::openweather::OpenWeatherError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Upstream weather provider failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OpenWeatherError> for AppError {
    fn from(err: OpenWeatherError) -> Self {
        match err {
            OpenWeatherError::NotFound(message) => AppError::NotFound(message),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        // Internal details stay in the logs.
        let message = match &self {
            AppError::Store(_) => "Database error".to_string(),
            AppError::Upstream(_) => "Server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("City is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("city not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Upstream("timeout".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_openweather_not_found_maps_to_not_found() {
        let err: AppError = OpenWeatherError::NotFound("city not found".into()).into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "city not found"));
    }

    #[test]
    fn test_openweather_api_error_maps_to_upstream() {
        let err: AppError = OpenWeatherError::ApiError("HTTP 503".into()).into();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_response_body_carries_error_message() {
        let response = AppError::Validation("City is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "City is required" }));
    }
}
