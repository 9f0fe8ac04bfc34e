use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document store unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Document store rejected credentials (status {status})")]
    Auth { status: u16 },

    #[error("Document store error (status {status}): {body}")]
    Remote { status: u16, body: String },

    #[error("Unexpected response shape: missing {path}")]
    UnexpectedResponseShape { path: String, raw: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Stable snake_case tag exposed to API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Network(_) => "network",
            AppError::Auth { .. } => "auth",
            AppError::Remote { .. } => "remote",
            AppError::UnexpectedResponseShape { .. } => "unexpected_response_shape",
            AppError::InsufficientData(_) => "insufficient_data",
            AppError::UnknownPeriod(_) => "unknown_period",
            AppError::Json(_) => "json",
            AppError::Io(_) => "io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownPeriod(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientData(_) => StatusCode::NOT_FOUND,
            AppError::Network(_)
            | AppError::Auth { .. }
            | AppError::Remote { .. }
            | AppError::UnexpectedResponseShape { .. } => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Json(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_map_to_bad_gateway() {
        assert_eq!(AppError::Auth { status: 401 }.status(), StatusCode::BAD_GATEWAY);
        let remote = AppError::Remote { status: 503, body: "down".to_string() };
        assert_eq!(remote.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(remote.kind(), "remote");
    }

    #[test]
    fn caller_errors_are_not_gateway_errors() {
        let unknown = AppError::UnknownPeriod("Last Decade".to_string());
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unknown.to_string(), "Unknown period: Last Decade");
        let empty = AppError::InsufficientData("no documents since now-1h".to_string());
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    }
}
