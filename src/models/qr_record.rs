use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::models::payload::{ContentType, QrPayload};
use crate::models::style::StyleConfig;

/// A persisted QR code as returned by the backend.
///
/// `content_type` is implied by the payload variant and `is_dynamic` is
/// fixed at creation; neither changes afterwards.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawQrRecord")]
pub struct QrRecord {
    pub id: String,
    pub short_code: String, // Assigned by the backend
    pub name: Option<String>,
    pub payload: QrPayload,
    pub style: StyleConfig,
    pub is_dynamic: bool, // Encodes the redirect URL instead of the payload
    pub is_paused: bool,
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Wire shape: `contentType` and `payload` are siblings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQrRecord {
    #[serde(alias = "_id")]
    id: String,
    short_code: String,
    #[serde(default)]
    name: Option<String>,
    content_type: ContentType,
    payload: serde_json::Value,
    #[serde(default)]
    style: StyleConfig,
    #[serde(default)]
    is_dynamic: bool,
    #[serde(default)]
    is_paused: bool,
    #[serde(default)]
    scan_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<RawQrRecord> for QrRecord {
    type Error = serde_json::Error;

    fn try_from(raw: RawQrRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            payload: QrPayload::from_parts(raw.content_type, raw.payload)?,
            id: raw.id,
            short_code: raw.short_code,
            name: raw.name,
            style: raw.style,
            is_dynamic: raw.is_dynamic,
            is_paused: raw.is_paused,
            scan_count: raw.scan_count,
            created_at: raw.created_at,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QrRecordRef<'a> {
    id: &'a str,
    short_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    content_type: ContentType,
    payload: &'a QrPayload,
    style: &'a StyleConfig,
    is_dynamic: bool,
    is_paused: bool,
    scan_count: i64,
    created_at: DateTime<Utc>,
}

impl Serialize for QrRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        QrRecordRef {
            id: &self.id,
            short_code: &self.short_code,
            name: self.name.as_deref(),
            content_type: self.content_type(),
            payload: &self.payload,
            style: &self.style,
            is_dynamic: self.is_dynamic,
            is_paused: self.is_paused,
            scan_count: self.scan_count,
            created_at: self.created_at,
        }
        .serialize(serializer)
    }
}

impl QrRecord {
    pub fn content_type(&self) -> ContentType {
        self.payload.content_type()
    }

    /// Name shown in lists and typed to confirm deletion.
    pub fn display_label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.short_code,
        }
    }

    pub fn dynamic_url(&self, origin: &str) -> String {
        format!("{}/qr/{}", origin.trim_end_matches('/'), self.short_code)
    }

    /// The string placed in the symbol.
    pub fn encoded_data(&self, origin: &str) -> String {
        if self.is_dynamic {
            self.dynamic_url(origin)
        } else {
            self.payload.encode()
        }
    }

    /// Static payloads are baked into the printed symbol.
    pub fn payload_editable(&self) -> bool {
        self.is_dynamic
    }

    pub fn can_pause(&self) -> bool {
        self.is_dynamic
    }

    pub fn accepts_scans(&self) -> bool {
        !(self.is_dynamic && self.is_paused)
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, short_code: &str, is_dynamic: bool) -> QrRecord {
    use crate::models::payload::UrlPayload;

    QrRecord {
        id: id.to_string(),
        short_code: short_code.to_string(),
        name: None,
        payload: QrPayload::Url(UrlPayload {
            url: "https://example.com/menu".to_string(),
        }),
        style: StyleConfig::default(),
        is_dynamic,
        is_paused: false,
        scan_count: 0,
        created_at: Utc::now(),
    }
}
