use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// HTTP-facing error: a stable machine-readable kind plus a message. Kinds
/// that indicate an internal fault (build, persistence) are captured to
/// sentry at construction; caller-input errors are not.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: format!("{err:#}"),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            kind: "unauthorized",
            message: "missing or invalid api key".to_string(),
        }
    }

    pub fn build_failed(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "document build failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "build_failed",
            message: "failed to build presentation document".to_string(),
        }
    }

    pub fn persistence_failed(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "failed to persist built document");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "persistence_failed",
            message: "failed to store presentation document".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: "no such route".to_string(),
        }
    }

    #[cfg(test)]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.kind, "message": self.message })),
        )
            .into_response()
    }
}
