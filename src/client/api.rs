//! reqwest implementation of [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{ApiError, ApiResult, Backend, MAX_ASSET_BYTES};
use crate::models::analytics::UserAnalytics;
use crate::models::blog::BlogPost;
use crate::models::payload::ContentType;
use crate::models::qr_record::QrRecord;
use crate::structs::auth::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    ResetPasswordRequest, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::structs::blog_request::BlogRequest;
use crate::structs::qr_request::{CreateQrRequest, UpdateQrRequest};
use crate::structs::redirect::RedirectTarget;
use crate::structs::upload::{UploadFile, UploadKind, UploadResponse};
use crate::utils::encode::percent_encode;

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client for the backend service.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// * `base_url` - e.g. `https://api.example.com/api`.
    ///
    /// Redirects are not followed: the redirect endpoint's `Location` is
    /// the answer, not something to fetch.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuses an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    // ---- private helpers ----

    /// Tags the request with a fresh request id, sends it and logs the
    /// outcome. Does not look at the status.
    async fn dispatch(&self, request: RequestBuilder) -> ApiResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        let request = request.header(REQUEST_ID_HEADER, &request_id).build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        match self.client.execute(request).await {
            Ok(response) => {
                log::debug!(
                    "{} {} [{}] -> {}",
                    method,
                    path,
                    request_id,
                    response.status()
                );
                Ok(response)
            }
            Err(e) => {
                log::warn!("{} {} [{}] failed: {}", method, path, request_id, e);
                Err(ApiError::Request(e))
            }
        }
    }

    /// Sends the request and turns a non-2xx status into
    /// [`ApiError::Backend`].
    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self.dispatch(request).await?;
        Self::ensure_success(response).await
    }

    async fn ensure_success(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_body(status.as_u16(), &body);
            log::warn!("Backend rejected request: {}", err);
            return Err(err);
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            log::error!("Failed to decode backend response: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn fetch_unit(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn register(&self, req: &RegisterRequest) -> ApiResult<MessageResponse> {
        self.fetch_json(self.post("auth/register").json(req)).await
    }

    async fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse> {
        self.fetch_json(self.post("auth/login").json(req)).await
    }

    async fn verify_email_otp(&self, req: &VerifyOtpRequest) -> ApiResult<VerifyOtpResponse> {
        self.fetch_json(self.post("auth/verify-email-otp").json(req))
            .await
    }

    async fn resend_email_otp(&self, req: &EmailRequest) -> ApiResult<MessageResponse> {
        self.fetch_json(self.post("auth/resend-email-otp").json(req))
            .await
    }

    async fn request_forgot_password_otp(
        &self,
        req: &EmailRequest,
    ) -> ApiResult<MessageResponse> {
        self.fetch_json(self.post("auth/request-forgot-password-otp").json(req))
            .await
    }

    async fn verify_forgot_password_otp(
        &self,
        req: &VerifyOtpRequest,
    ) -> ApiResult<VerifyOtpResponse> {
        self.fetch_json(self.post("auth/verify-forgot-password-otp").json(req))
            .await
    }

    async fn reset_password(
        &self,
        token: &str,
        req: &ResetPasswordRequest,
    ) -> ApiResult<MessageResponse> {
        self.fetch_json(self.post("auth/reset-password").bearer_auth(token).json(req))
            .await
    }

    async fn list_blogs(&self) -> ApiResult<Vec<BlogPost>> {
        self.fetch_json(self.get("blog")).await
    }

    async fn get_blog(&self, slug: &str) -> ApiResult<BlogPost> {
        self.fetch_json(self.get(&format!("blog/{}", percent_encode(slug))))
            .await
    }

    async fn create_blog(&self, token: &str, req: &BlogRequest) -> ApiResult<BlogPost> {
        self.fetch_json(self.post("blog").bearer_auth(token).json(req))
            .await
    }

    async fn update_blog(
        &self,
        token: &str,
        slug: &str,
        req: &BlogRequest,
    ) -> ApiResult<BlogPost> {
        let path = format!("blog/{}", percent_encode(slug));
        self.fetch_json(self.put(&path).bearer_auth(token).json(req))
            .await
    }

    async fn delete_blog(&self, token: &str, slug: &str) -> ApiResult<()> {
        let path = format!("blog/{}", percent_encode(slug));
        self.fetch_unit(self.delete(&path).bearer_auth(token)).await
    }

    async fn create_qr(&self, token: &str, req: &CreateQrRequest) -> ApiResult<QrRecord> {
        self.fetch_json(self.post("qrcodes/create").bearer_auth(token).json(req))
            .await
    }

    async fn update_qr(
        &self,
        token: &str,
        id: &str,
        req: &UpdateQrRequest,
    ) -> ApiResult<QrRecord> {
        let path = format!("qrcodes/{}", percent_encode(id));
        self.fetch_json(self.put(&path).bearer_auth(token).json(req))
            .await
    }

    async fn get_qr(&self, token: &str, id: &str) -> ApiResult<QrRecord> {
        let path = format!("qrcodes/{}", percent_encode(id));
        self.fetch_json(self.get(&path).bearer_auth(token)).await
    }

    async fn delete_qr(&self, token: &str, id: &str) -> ApiResult<()> {
        let path = format!("qrcodes/{}", percent_encode(id));
        self.fetch_unit(self.delete(&path).bearer_auth(token)).await
    }

    async fn toggle_pause(&self, token: &str, id: &str) -> ApiResult<QrRecord> {
        let path = format!("qrcodes/pause/{}", percent_encode(id));
        self.fetch_json(self.patch(&path).bearer_auth(token)).await
    }

    async fn list_user_qrs(&self, token: &str) -> ApiResult<Vec<QrRecord>> {
        self.fetch_json(self.get("qrcodes/user").bearer_auth(token))
            .await
    }

    async fn user_analytics(&self, token: &str) -> ApiResult<UserAnalytics> {
        self.fetch_json(self.get("qrcodes/user/analytics").bearer_auth(token))
            .await
    }

    async fn public_qr(&self, short_code: &str) -> ApiResult<QrRecord> {
        let path = format!("qrcodes/public/{}", percent_encode(short_code));
        self.fetch_json(self.get(&path)).await
    }

    async fn resolve_redirect(&self, short_code: &str) -> ApiResult<RedirectTarget> {
        let path = format!("qrcodes/redirect/{}", percent_encode(short_code));
        let response = self.dispatch(self.get(&path)).await?;

        // The backend may answer with a plain HTTP redirect instead of JSON.
        if response.status().is_redirection() && response.status() != StatusCode::NOT_MODIFIED {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return match location {
                Some(url) => Ok(RedirectTarget {
                    content_type: ContentType::Url,
                    redirect_url: Some(url),
                }),
                None => Err(ApiError::Decode(
                    "redirect response without a Location header".to_string(),
                )),
            };
        }

        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        file: UploadFile,
    ) -> ApiResult<UploadResponse> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.fetch_json(self.post(kind.path()).bearer_auth(token).multipart(form))
            .await
    }

    async fn fetch_asset(&self, url: &str) -> ApiResult<Vec<u8>> {
        let mut response = self.send(self.client.get(url)).await?;
        check_declared_length(response.content_length(), MAX_ASSET_BYTES)?;

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            append_capped(&mut body, &chunk, MAX_ASSET_BYTES)?;
        }
        Ok(body)
    }
}

/// Refuses a body whose `Content-Length` is already over `limit`.
fn check_declared_length(declared: Option<u64>, limit: usize) -> ApiResult<()> {
    match declared {
        Some(len) if len > limit as u64 => {
            log::warn!("Refusing asset of {} bytes", len);
            Err(ApiError::TooLarge { limit })
        }
        _ => Ok(()),
    }
}

/// Appends `chunk` unless that would take `body` past `limit`.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> ApiResult<()> {
    if body.len() + chunk.len() > limit {
        log::warn!("Asset body passed {} bytes, aborting read", limit);
        return Err(ApiError::TooLarge { limit });
    }
    body.extend_from_slice(chunk);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let client = ApiClient::new("https://api.example.com/api/").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/api");
        assert_eq!(client.url("qrcodes/user"), "https://api.example.com/api/qrcodes/user");
    }

    #[test]
    fn upload_paths_follow_the_backend_layout() {
        assert_eq!(UploadKind::Logo.path(), "upload/logo/image");
        assert_eq!(UploadKind::BlogImage.path(), "upload/blog/image");
        assert_eq!(UploadKind::Audio.path(), "upload/audio");
    }

    #[test]
    fn declared_length_over_the_cap_is_refused() {
        assert!(check_declared_length(None, 16).is_ok());
        assert!(check_declared_length(Some(16), 16).is_ok());
        assert!(matches!(
            check_declared_length(Some(17), 16),
            Err(ApiError::TooLarge { limit: 16 })
        ));
    }

    #[test]
    fn streamed_body_stops_at_the_cap() {
        let mut body = Vec::new();
        append_capped(&mut body, &[1; 10], 16).unwrap();
        append_capped(&mut body, &[2; 6], 16).unwrap();
        assert_eq!(body.len(), 16);

        let err = append_capped(&mut body, &[3], 16).unwrap_err();
        assert!(matches!(err, ApiError::TooLarge { limit: 16 }));
        assert_eq!(body.len(), 16);
        assert_eq!(
            ApiError::TooLarge { limit: MAX_ASSET_BYTES }.user_message(),
            "File is too large (limit 10 MB)"
        );
    }
}
