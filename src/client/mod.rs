//! Typed access to the backend REST service.
//!
//! [`Backend`] is the seam every flow, view and handler talks through;
//! [`api::ApiClient`] implements it over HTTP.

pub mod api;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::analytics::UserAnalytics;
use crate::models::blog::BlogPost;
use crate::models::qr_record::QrRecord;
use crate::structs::auth::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    ResetPasswordRequest, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::structs::blog_request::BlogRequest;
use crate::structs::qr_request::{CreateQrRequest, UpdateQrRequest};
use crate::structs::redirect::RedirectTarget;
use crate::structs::upload::{UploadFile, UploadKind, UploadResponse};

/// Shown when the backend gives no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Largest asset body read by [`Backend::fetch_asset`].
pub const MAX_ASSET_BYTES: usize = 10 * 1024 * 1024;

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Backend error ({status}): {message}")]
    Backend {
        status: u16,
        /// The body's `message` (or `error`) field, or the generic message.
        message: String,
    },

    /// The backend answered 2xx with a body we could not read.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A fetched body ran past its byte cap.
    #[error("Response larger than {limit} bytes")]
    TooLarge { limit: usize },
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ApiError {
    /// Builds a backend error from a failed response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        ApiError::Backend { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Request(err) => err.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::TooLarge { .. } => None,
        }
    }

    /// Message fit to show next to the form that triggered the call.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::TooLarge { limit } => {
                format!("File is too large (limit {} MB)", limit / (1024 * 1024))
            }
            ApiError::Request(_) | ApiError::Decode(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// The backend's REST surface.
///
/// Calls that act on the user's own data take the session token, which is
/// sent as `Authorization: Bearer <token>`.
#[async_trait]
pub trait Backend: Send + Sync {
    // ---- auth ----
    async fn register(&self, req: &RegisterRequest) -> ApiResult<MessageResponse>;
    async fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse>;
    async fn verify_email_otp(&self, req: &VerifyOtpRequest) -> ApiResult<VerifyOtpResponse>;
    async fn resend_email_otp(&self, req: &EmailRequest) -> ApiResult<MessageResponse>;
    async fn request_forgot_password_otp(&self, req: &EmailRequest)
    -> ApiResult<MessageResponse>;
    async fn verify_forgot_password_otp(
        &self,
        req: &VerifyOtpRequest,
    ) -> ApiResult<VerifyOtpResponse>;
    async fn reset_password(
        &self,
        token: &str,
        req: &ResetPasswordRequest,
    ) -> ApiResult<MessageResponse>;

    // ---- blog ----
    async fn list_blogs(&self) -> ApiResult<Vec<BlogPost>>;
    async fn get_blog(&self, slug: &str) -> ApiResult<BlogPost>;
    async fn create_blog(&self, token: &str, req: &BlogRequest) -> ApiResult<BlogPost>;
    async fn update_blog(&self, token: &str, slug: &str, req: &BlogRequest)
    -> ApiResult<BlogPost>;
    async fn delete_blog(&self, token: &str, slug: &str) -> ApiResult<()>;

    // ---- qr codes ----
    async fn create_qr(&self, token: &str, req: &CreateQrRequest) -> ApiResult<QrRecord>;
    async fn update_qr(&self, token: &str, id: &str, req: &UpdateQrRequest)
    -> ApiResult<QrRecord>;
    async fn get_qr(&self, token: &str, id: &str) -> ApiResult<QrRecord>;
    async fn delete_qr(&self, token: &str, id: &str) -> ApiResult<()>;
    /// Flips the paused flag and returns the updated record.
    async fn toggle_pause(&self, token: &str, id: &str) -> ApiResult<QrRecord>;
    async fn list_user_qrs(&self, token: &str) -> ApiResult<Vec<QrRecord>>;
    async fn user_analytics(&self, token: &str) -> ApiResult<UserAnalytics>;
    async fn public_qr(&self, short_code: &str) -> ApiResult<QrRecord>;
    /// Resolves a scan. Paused codes are refused with a non-2xx status.
    async fn resolve_redirect(&self, short_code: &str) -> ApiResult<RedirectTarget>;

    // ---- files ----
    async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        file: UploadFile,
    ) -> ApiResult<UploadResponse>;
    /// Downloads an uploaded asset, e.g. a logo to embed in a render.
    async fn fetch_asset(&self, url: &str) -> ApiResult<Vec<u8>>;
}
