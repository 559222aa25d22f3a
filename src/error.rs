use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Io(_)
            | AppError::Inference(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged in full and answered generically
        let message = match &self {
            AppError::NotFound(msg) | AppError::InvalidInput(msg) | AppError::Unauthorized(msg) => {
                msg.clone()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "database error".to_string()
            }
            AppError::Inference(msg) => {
                tracing::error!(error = %msg, "Inference error");
                "inference error".to_string()
            }
            AppError::Cache(_) | AppError::Io(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                "internal server error".to_string()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
