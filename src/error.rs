use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, error::BlockingError};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::client::ApiError;
use crate::flow::validation_message;
use crate::models::style::StyleViolation;
use crate::render::{ExportError, RenderError};
use crate::session::SessionError;
use crate::views::ViewError;

/// Errors returned by the HTTP handlers, rendered as `{error, code}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// A non-2xx answer from the backend, passed through with its status.
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Backend unavailable")]
    BadGateway,
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Backend { .. } => "BACKEND_ERROR",
            AppError::BadGateway => "BAD_GATEWAY",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AppError::Internal(err.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::BadGateway => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(e) = self {
            log::error!("Internal error: {:#}", e);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            code: self.code(),
        })
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Backend { status, message } if status >= 400 => {
                AppError::Backend { status, message }
            }
            ApiError::Backend { status, message } => {
                log::warn!("Backend answered {} where an error was expected", status);
                AppError::Backend {
                    status: 502,
                    message,
                }
            }
            ApiError::Request(e) => {
                log::error!("Backend request failed: {}", e);
                AppError::BadGateway
            }
            ApiError::Decode(e) => {
                log::error!("Backend response unreadable: {}", e);
                AppError::BadGateway
            }
            too_large @ ApiError::TooLarge { .. } => AppError::BadRequest(too_large.user_message()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(e) => AppError::Internal(e),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::Session(e) => e.into(),
            ViewError::Api(e) => e.into(),
            ViewError::NotFound(_) => AppError::NotFound(err.to_string()),
            ViewError::Busy => AppError::Conflict(err.to_string()),
            ViewError::ConfirmationMismatch | ViewError::NotDynamic | ViewError::Invalid(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Format(e) => AppError::internal(e),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Render(e) => e.into(),
            other => AppError::internal(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::BadRequest(validation_message(&errors))
    }
}

impl From<Vec<StyleViolation>> for AppError {
    fn from(violations: Vec<StyleViolation>) -> Self {
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        AppError::BadRequest(message)
    }
}

impl From<BlockingError> for AppError {
    fn from(err: BlockingError) -> Self {
        AppError::internal(anyhow::anyhow!("{}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn backend_status_is_passed_through() {
        let err = AppError::from(ApiError::Backend {
            status: 423,
            message: "This QR code is paused".into(),
        });
        assert_eq!(err.status_code().as_u16(), 423);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "This QR code is paused");
        assert_eq!(json["code"], "BACKEND_ERROR");
    }

    #[actix_web::test]
    async fn internal_errors_are_masked() {
        let err = AppError::internal(anyhow::anyhow!("disk on fire"));
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[test]
    fn session_errors_are_unauthorized() {
        let err = AppError::from(SessionError::Expired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
