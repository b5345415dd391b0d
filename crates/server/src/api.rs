use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bakehouse_core::errors::{ApplicationError, InterfaceError};
use bakehouse_db::DirectoryError;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// HTTP-facing error. Client errors carry the underlying message, server
/// errors only the user-safe one.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: new_correlation_id(),
        })
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(InterfaceError::NotFound {
            message: message.into(),
            correlation_id: new_correlation_id(),
        })
    }

    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

impl From<DirectoryError> for ApiError {
    fn from(error: DirectoryError) -> Self {
        let correlation_id = new_correlation_id();
        let interface = ApplicationError::from(error).into_interface(correlation_id);
        Self(interface)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                error = %self.0.message(),
                "request failed"
            );
            self.0.user_message().to_string()
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0.message(),
                "request rejected"
            );
            self.0.message().to_string()
        };

        let body =
            ErrorBody { error: message, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request(format!("`{raw}` is not a valid {entity} id")))
}
