use application::{ApplicationError, BridgeError, RejectReason};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidArgument { field, reason } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            DomainError::UnknownEventKind(kind) => {
                ApiError::bad_request(format!("unknown event kind: {}", kind))
            }
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Rejected(reason) => {
                let message = match reason {
                    RejectReason::QueueFull => "event queue is full, retry later",
                    RejectReason::ShuttingDown => "server is shutting down",
                };
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "BRIDGE_BUSY", message)
            }
            BridgeError::PersistenceFailed { event_id, source } => {
                tracing::error!(%event_id, error = %source, "event could not be persisted");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_FAILED",
                    "event could not be persisted",
                )
            }
            BridgeError::NotDelivered => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_DELIVERED",
                "event was dropped during shutdown",
            ),
            other @ (BridgeError::ShutdownTimeout { .. } | BridgeError::WorkerFailed(_)) => {
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Domain(err) => err.into(),
            ApplicationError::Bridge(err) => err.into(),
            ApplicationError::Archive(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ARCHIVE_ERROR",
                format!("archive error: {}", err),
            ),
            ApplicationError::Rebuild(err) => ApiError::internal_server_error(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
