use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hearth_core::error::{self, ApiError};

use crate::upstream::UpstreamError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Resource does not exist (404)
    NotFound { resource: String },
    /// An upstream service failed (502/504)
    Upstream(UpstreamError),
    /// Database error (500)
    Database(sqlx::Error),
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // TODO: extract request_id from extensions once tracing middleware carries one
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Upstream(err) => {
                tracing::warn!("Upstream failure: {}", err);
                let (status, code, docs_hint) = match &err {
                    UpstreamError::Timeout { .. } => (
                        StatusCode::GATEWAY_TIMEOUT,
                        error::codes::UPSTREAM_TIMEOUT,
                        "The service did not answer in time. Retry with backoff.",
                    ),
                    UpstreamError::Decode { .. } | UpstreamError::Protocol { .. } => (
                        StatusCode::BAD_GATEWAY,
                        error::codes::UPSTREAM_PROTOCOL,
                        "The service answered with an unusable payload. This is a bug on the service side.",
                    ),
                    UpstreamError::Unreachable { .. } | UpstreamError::Status { .. } => (
                        StatusCode::BAD_GATEWAY,
                        error::codes::UPSTREAM_UNAVAILABLE,
                        "The service is degraded. Retry with backoff.",
                    ),
                };
                (
                    status,
                    ApiError {
                        error: code.to_string(),
                        message: err.to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(docs_hint.to_string()),
                    },
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError::Upstream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_timeout_maps_to_504() {
        let response = AppError::Upstream(UpstreamError::Timeout {
            service: "sentiment service",
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn upstream_failures_map_to_502() {
        for err in [
            UpstreamError::Unreachable {
                service: "agents service",
                detail: "connection refused".to_string(),
            },
            UpstreamError::Status {
                service: "agents service",
                status: 500,
            },
            UpstreamError::Decode {
                service: "agents service",
            },
        ] {
            let response = AppError::Upstream(err).into_response();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[tokio::test]
    async fn upstream_body_carries_machine_readable_code() {
        let response = AppError::Upstream(UpstreamError::Timeout {
            service: "risk service",
        })
        .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "upstream_timeout");
        assert!(body["request_id"].is_string());
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::NotFound {
            resource: "agent 14".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
