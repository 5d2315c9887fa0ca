//! Logo and file uploads. A reference is only replaced once the backend
//! has accepted the file; on failure the old one stays and the user gets an
//! alert.

use std::fmt;

use crate::client::{ApiResult, Backend};
use crate::models::payload::{ContentType, QrPayload};
use crate::models::style::StyleConfig;
use crate::session::Session;
use crate::structs::upload::{UploadFile, UploadKind, UploadResponse};

/// Largest file accepted for upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Blocking message shown when an upload fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAlert {
    pub message: String,
}

impl UploadAlert {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UploadAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upload failed: {}", self.message)
    }
}

impl std::error::Error for UploadAlert {}

pub fn kind_for(content_type: ContentType) -> Option<UploadKind> {
    match content_type {
        ContentType::Image => Some(UploadKind::Image),
        ContentType::Pdf => Some(UploadKind::Pdf),
        ContentType::Audio => Some(UploadKind::Audio),
        _ => None,
    }
}

/// Checks the picked file before anything is sent.
pub fn check_file(kind: UploadKind, file: &UploadFile) -> Result<(), UploadAlert> {
    if file.bytes.is_empty() {
        return Err(UploadAlert::new("the file is empty"));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadAlert::new("the file is larger than 10 MB"));
    }
    let mime = file.content_type.to_ascii_lowercase();
    let accepted = match kind {
        UploadKind::Image | UploadKind::Logo | UploadKind::BlogImage => mime.starts_with("image/"),
        UploadKind::Pdf => mime == "application/pdf",
        UploadKind::Audio => mime.starts_with("audio/"),
    };
    if !accepted {
        return Err(UploadAlert::new(format!(
            "{} files are not accepted here",
            file.content_type
        )));
    }
    Ok(())
}

/// Writes the uploaded url into `slot` on success only.
pub fn apply_upload(slot: &mut String, outcome: ApiResult<UploadResponse>) -> Result<(), UploadAlert> {
    match outcome {
        Ok(response) => {
            *slot = response.url;
            Ok(())
        }
        Err(e) => {
            log::warn!("Upload failed: {}", e);
            Err(UploadAlert::new(e.user_message()))
        }
    }
}

async fn send(
    backend: &dyn Backend,
    session: &Session,
    kind: UploadKind,
    file: UploadFile,
) -> Result<ApiResult<UploadResponse>, UploadAlert> {
    check_file(kind, &file)?;
    log::info!("Uploading {} ({} bytes)", file.file_name, file.bytes.len());
    Ok(backend.upload(&session.token, kind, file).await)
}

pub async fn upload_logo(
    backend: &dyn Backend,
    session: &Session,
    style: &mut StyleConfig,
    file: UploadFile,
) -> Result<(), UploadAlert> {
    let outcome = send(backend, session, UploadKind::Logo, file).await?;
    let mut url = style.logo_image_url.clone().unwrap_or_default();
    apply_upload(&mut url, outcome)?;
    style.logo_image_url = Some(url);
    Ok(())
}

/// Uploads the file behind an IMAGE, PDF or AUDIO payload.
pub async fn upload_payload_file(
    backend: &dyn Backend,
    session: &Session,
    payload: &mut QrPayload,
    file: UploadFile,
) -> Result<(), UploadAlert> {
    let kind = kind_for(payload.content_type()).ok_or_else(|| {
        UploadAlert::new(format!("{} content has no file", payload.content_type()))
    })?;
    let outcome = send(backend, session, kind, file).await?;
    match payload.file_url_mut() {
        Some(slot) => apply_upload(slot, outcome),
        None => Err(UploadAlert::new("this content has no file")),
    }
}
