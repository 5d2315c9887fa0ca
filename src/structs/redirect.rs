use serde::{Deserialize, Serialize};

use crate::models::payload::{ContentType, QrPayload};

/// Answer of the backend's redirect endpoint for an active code.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectTarget {
    pub content_type: ContentType,
    #[serde(default, alias = "url")]
    pub redirect_url: Option<String>,
}

/// What `/page/:shortCode` shows for a displayed content type.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PagePreview {
    Image { url: String },
    Text { text: String },
    Pdf { url: String },
    Audio { url: String },
    Url { url: String },
}

impl PagePreview {
    pub fn from_payload(payload: &QrPayload) -> Option<Self> {
        match payload {
            QrPayload::Image(p) => Some(PagePreview::Image { url: p.url.clone() }),
            QrPayload::Text(p) => Some(PagePreview::Text {
                text: p.text.clone(),
            }),
            QrPayload::Pdf(p) => Some(PagePreview::Pdf { url: p.url.clone() }),
            QrPayload::Audio(p) => Some(PagePreview::Audio { url: p.url.clone() }),
            QrPayload::Url(p) => Some(PagePreview::Url { url: p.url.clone() }),
            _ => None,
        }
    }
}
