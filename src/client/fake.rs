//! In-memory [`Backend`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{ApiError, ApiResult, Backend};
use crate::models::analytics::{QrScanSummary, UserAnalytics};
use crate::models::blog::BlogPost;
use crate::models::payload::ContentType;
use crate::models::qr_record::QrRecord;
use crate::models::style::StyleConfig;
use crate::structs::auth::{
    EmailRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    ResetPasswordRequest, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::structs::blog_request::BlogRequest;
use crate::structs::qr_request::{CreateQrRequest, UpdateQrRequest};
use crate::structs::redirect::RedirectTarget;
use crate::structs::upload::{UploadFile, UploadKind, UploadResponse};

pub const VALID_OTP: &str = "123456";
pub const RESET_TOKEN: &str = "reset-token";

#[derive(Default)]
struct State {
    records: HashMap<String, QrRecord>,
    blogs: Vec<BlogPost>,
    assets: HashMap<String, Vec<u8>>,
    next_id: u64,
    fail_next: Option<(u16, String)>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: QrRecord) {
        let mut state = self.state.lock().unwrap();
        state.records.insert(record.id.clone(), record);
    }

    pub fn insert_blog(&self, post: BlogPost) {
        self.state.lock().unwrap().blogs.push(post);
    }

    pub fn insert_asset(&self, url: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .assets
            .insert(url.to_string(), bytes);
    }

    pub fn record(&self, id: &str) -> Option<QrRecord> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    /// Makes the next call fail with `status` and `message`.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.state.lock().unwrap().fail_next = Some((status, message.to_string()));
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn begin(&self, call: &str) -> ApiResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if let Some((status, message)) = state.fail_next.take() {
            return Err(ApiError::Backend { status, message });
        }
        Ok(state)
    }

    fn authorize(token: &str) -> ApiResult<()> {
        if token.is_empty() {
            return Err(ApiError::Backend {
                status: 401,
                message: "Unauthorized".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::Backend {
            status: 404,
            message: format!("{} not found", what),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn register(&self, _req: &RegisterRequest) -> ApiResult<MessageResponse> {
        self.begin("register")?;
        Ok(MessageResponse {
            message: Some("OTP sent".to_string()),
        })
    }

    async fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse> {
        self.begin("login")?;
        let exp = Utc::now().timestamp() + 3600;
        Ok(LoginResponse {
            token: crate::utils::jwt::mint_token(&req.email, Some(exp)),
            user: None,
        })
    }

    async fn verify_email_otp(&self, req: &VerifyOtpRequest) -> ApiResult<VerifyOtpResponse> {
        self.begin("verify_email_otp")?;
        if req.otp != VALID_OTP {
            return Err(ApiError::Backend {
                status: 400,
                message: "Invalid OTP".to_string(),
            });
        }
        Ok(VerifyOtpResponse {
            message: Some("Email verified".to_string()),
            token: None,
        })
    }

    async fn resend_email_otp(&self, _req: &EmailRequest) -> ApiResult<MessageResponse> {
        self.begin("resend_email_otp")?;
        Ok(MessageResponse::default())
    }

    async fn request_forgot_password_otp(
        &self,
        _req: &EmailRequest,
    ) -> ApiResult<MessageResponse> {
        self.begin("request_forgot_password_otp")?;
        Ok(MessageResponse::default())
    }

    async fn verify_forgot_password_otp(
        &self,
        req: &VerifyOtpRequest,
    ) -> ApiResult<VerifyOtpResponse> {
        self.begin("verify_forgot_password_otp")?;
        if req.otp != VALID_OTP {
            return Err(ApiError::Backend {
                status: 400,
                message: "Invalid OTP".to_string(),
            });
        }
        Ok(VerifyOtpResponse {
            message: None,
            token: Some(RESET_TOKEN.to_string()),
        })
    }

    async fn reset_password(
        &self,
        token: &str,
        _req: &ResetPasswordRequest,
    ) -> ApiResult<MessageResponse> {
        self.begin("reset_password")?;
        if token != RESET_TOKEN {
            return Err(ApiError::Backend {
                status: 401,
                message: "Reset link expired".to_string(),
            });
        }
        Ok(MessageResponse::default())
    }

    async fn list_blogs(&self) -> ApiResult<Vec<BlogPost>> {
        let state = self.begin("list_blogs")?;
        Ok(state.blogs.clone())
    }

    async fn get_blog(&self, slug: &str) -> ApiResult<BlogPost> {
        let state = self.begin("get_blog")?;
        state
            .blogs
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| Self::not_found("Blog"))
    }

    async fn create_blog(&self, token: &str, req: &BlogRequest) -> ApiResult<BlogPost> {
        let mut state = self.begin("create_blog")?;
        Self::authorize(token)?;
        if state.blogs.iter().any(|p| p.slug == req.slug) {
            return Err(ApiError::Backend {
                status: 409,
                message: "Slug already taken".to_string(),
            });
        }
        let post = blog_from_request(req);
        state.blogs.push(post.clone());
        Ok(post)
    }

    async fn update_blog(
        &self,
        token: &str,
        slug: &str,
        req: &BlogRequest,
    ) -> ApiResult<BlogPost> {
        let mut state = self.begin("update_blog")?;
        Self::authorize(token)?;
        let post = state
            .blogs
            .iter_mut()
            .find(|p| p.slug == slug)
            .ok_or_else(|| Self::not_found("Blog"))?;
        *post = blog_from_request(req);
        Ok(post.clone())
    }

    async fn delete_blog(&self, token: &str, slug: &str) -> ApiResult<()> {
        let mut state = self.begin("delete_blog")?;
        Self::authorize(token)?;
        let before = state.blogs.len();
        state.blogs.retain(|p| p.slug != slug);
        if state.blogs.len() == before {
            return Err(Self::not_found("Blog"));
        }
        Ok(())
    }

    async fn create_qr(&self, token: &str, req: &CreateQrRequest) -> ApiResult<QrRecord> {
        let mut state = self.begin("create_qr")?;
        Self::authorize(token)?;
        state.next_id += 1;
        let record = QrRecord {
            id: format!("qr-{}", state.next_id),
            short_code: format!("sc{:04}", state.next_id),
            name: None,
            payload: req.payload.clone(),
            style: StyleConfig::default(),
            is_dynamic: req.is_dynamic,
            is_paused: false,
            scan_count: 0,
            created_at: Utc::now(),
        };
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_qr(
        &self,
        token: &str,
        id: &str,
        req: &UpdateQrRequest,
    ) -> ApiResult<QrRecord> {
        let mut state = self.begin("update_qr")?;
        Self::authorize(token)?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| Self::not_found("QR code"))?;
        if req.payload.content_type() != record.content_type() {
            return Err(ApiError::Backend {
                status: 400,
                message: "Content type cannot change".to_string(),
            });
        }
        record.name = Some(req.name.clone());
        record.payload = req.payload.clone();
        record.style = req.style.clone();
        Ok(record.clone())
    }

    async fn get_qr(&self, token: &str, id: &str) -> ApiResult<QrRecord> {
        let state = self.begin("get_qr")?;
        Self::authorize(token)?;
        state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("QR code"))
    }

    async fn delete_qr(&self, token: &str, id: &str) -> ApiResult<()> {
        let mut state = self.begin("delete_qr")?;
        Self::authorize(token)?;
        state
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("QR code"))
    }

    async fn toggle_pause(&self, token: &str, id: &str) -> ApiResult<QrRecord> {
        let mut state = self.begin("toggle_pause")?;
        Self::authorize(token)?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| Self::not_found("QR code"))?;
        if !record.is_dynamic {
            return Err(ApiError::Backend {
                status: 400,
                message: "Only dynamic QR codes can be paused".to_string(),
            });
        }
        record.is_paused = !record.is_paused;
        Ok(record.clone())
    }

    async fn list_user_qrs(&self, token: &str) -> ApiResult<Vec<QrRecord>> {
        let state = self.begin("list_user_qrs")?;
        Self::authorize(token)?;
        let mut records: Vec<QrRecord> = state.records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn user_analytics(&self, token: &str) -> ApiResult<UserAnalytics> {
        let state = self.begin("user_analytics")?;
        Self::authorize(token)?;
        let records: Vec<&QrRecord> = state.records.values().collect();
        Ok(UserAnalytics {
            total_qr_codes: records.len() as i64,
            total_scans: records.iter().map(|r| r.scan_count).sum(),
            active_qr_codes: records.iter().filter(|r| !r.is_paused).count() as i64,
            paused_qr_codes: records.iter().filter(|r| r.is_paused).count() as i64,
            qr_codes: records
                .iter()
                .map(|r| QrScanSummary {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    short_code: r.short_code.clone(),
                    scan_count: r.scan_count,
                })
                .collect(),
        })
    }

    async fn public_qr(&self, short_code: &str) -> ApiResult<QrRecord> {
        let state = self.begin("public_qr")?;
        state
            .records
            .values()
            .find(|r| r.short_code == short_code)
            .cloned()
            .ok_or_else(|| Self::not_found("QR code"))
    }

    async fn resolve_redirect(&self, short_code: &str) -> ApiResult<RedirectTarget> {
        let mut state = self.begin("resolve_redirect")?;
        let record = state
            .records
            .values_mut()
            .find(|r| r.short_code == short_code)
            .ok_or_else(|| Self::not_found("QR code"))?;
        if !record.accepts_scans() {
            return Err(ApiError::Backend {
                status: 423,
                message: "This QR code is paused".to_string(),
            });
        }
        record.scan_count += 1;
        let content_type = record.content_type();
        let redirect_url = match content_type {
            ContentType::Text | ContentType::Location => None,
            _ => Some(record.payload.encode()),
        };
        Ok(RedirectTarget {
            content_type,
            redirect_url,
        })
    }

    async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        file: UploadFile,
    ) -> ApiResult<UploadResponse> {
        let mut state = self.begin("upload")?;
        Self::authorize(token)?;
        let url = format!("https://cdn.example.com/{}/{}", kind.path(), file.file_name);
        state.assets.insert(url.clone(), file.bytes);
        Ok(UploadResponse { url })
    }

    async fn fetch_asset(&self, url: &str) -> ApiResult<Vec<u8>> {
        let state = self.begin("fetch_asset")?;
        state
            .assets
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found("Asset"))
    }
}

fn blog_from_request(req: &BlogRequest) -> BlogPost {
    BlogPost {
        id: Some(format!("blog-{}", req.slug)),
        slug: req.slug.clone(),
        title: req.title.clone(),
        content: req.content.clone(),
        excerpt: req.excerpt.clone(),
        cover_image_url: req.cover_image_url.clone(),
        author: None,
        tags: req.tags.clone(),
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
    }
}
