use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::payload::{ContentType, QrPayload};
use crate::models::style::StyleConfig;

/// Step one of creation: obtains an id and short code.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateQrRequest {
    pub content_type: ContentType,
    pub payload: QrPayload,
    pub is_dynamic: bool,
}

/// Step two of creation, and every later edit: a full update.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQrRequest {
    pub name: String,
    pub payload: QrPayload,
    pub style: StyleConfig,
}

/// Body of the live preview and export endpoints.
#[derive(Deserialize, Validate)]
pub struct PreviewRequest {
    #[validate(length(min = 1, max = 2048, message = "Data must be 1 to 2048 characters"))]
    pub data: String,
    #[validate(range(min = 64, max = 2048, message = "Size must be between 64 and 2048"))]
    pub size: Option<u32>,
    #[validate(range(max = 256, message = "Margin must be at most 256"))]
    pub margin: Option<u32>,
    #[serde(default)]
    pub style: StyleConfig,
}

#[derive(Deserialize)]
pub struct QrSearchParams {
    pub search: Option<String>,
}

/// Type-to-confirm delete: must equal the record's label exactly.
#[derive(Deserialize)]
pub struct DeleteQrRequest {
    pub confirmation: String,
}
