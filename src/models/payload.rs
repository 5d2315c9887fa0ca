use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::utils::encode::{percent_encode, query_string};

/// What a QR code carries. Fixed once a record is created.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Url,
    Email,
    Sms,
    Phone,
    Youtube,
    Whatsapp,
    Location,
    Upi,
    Text,
    Image,
    Pdf,
    Audio,
}

impl ContentType {
    pub const ALL: [ContentType; 12] = [
        ContentType::Url,
        ContentType::Email,
        ContentType::Sms,
        ContentType::Phone,
        ContentType::Youtube,
        ContentType::Whatsapp,
        ContentType::Location,
        ContentType::Upi,
        ContentType::Text,
        ContentType::Image,
        ContentType::Pdf,
        ContentType::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Url => "URL",
            ContentType::Email => "EMAIL",
            ContentType::Sms => "SMS",
            ContentType::Phone => "PHONE",
            ContentType::Youtube => "YOUTUBE",
            ContentType::Whatsapp => "WHATSAPP",
            ContentType::Location => "LOCATION",
            ContentType::Upi => "UPI",
            ContentType::Text => "TEXT",
            ContentType::Image => "IMAGE",
            ContentType::Pdf => "PDF",
            ContentType::Audio => "AUDIO",
        }
    }

    /// Shown on the in-app page instead of being navigated to on scan.
    pub fn is_displayed_in_app(self) -> bool {
        matches!(
            self,
            ContentType::Image | ContentType::Text | ContentType::Pdf | ContentType::Audio
        )
    }

    /// Has a `/page/:shortCode` preview.
    pub fn has_page_preview(self) -> bool {
        self.is_displayed_in_app() || self == ContentType::Url
    }

    /// Backed by an uploaded file.
    pub fn is_file(self) -> bool {
        matches!(
            self,
            ContentType::Image | ContentType::Pdf | ContentType::Audio
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let valid = (7..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        && digits.chars().filter(|c| c.is_ascii_digit()).count() >= 7;
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("Invalid phone number".into()))
    }
}

fn validate_upi_id(upi_id: &str) -> Result<(), ValidationError> {
    let valid = match upi_id.split_once('@') {
        Some((name, handle)) => {
            !name.is_empty()
                && !handle.is_empty()
                && !handle.contains('@')
                && upi_id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@'))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("upi_id").with_message("Invalid UPI ID".into()))
    }
}

fn validate_youtube_url(url: &str) -> Result<(), ValidationError> {
    let is_youtube = reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .map(|host| {
            host == "youtu.be"
                || host == "youtube.com"
                || host.ends_with(".youtube.com")
        })
        .unwrap_or(false);
    if is_youtube {
        Ok(())
    } else {
        Err(ValidationError::new("youtube").with_message("Not a YouTube link".into()))
    }
}

fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UrlPayload {
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SmsPayload {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PhonePayload {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePayload {
    #[validate(url(message = "Invalid URL format"), custom(function = "validate_youtube_url"))]
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WhatsappPayload {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpiPayload {
    #[validate(custom(function = "validate_upi_id"))]
    pub upi_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
}

/// IMAGE, PDF and AUDIO payloads: a reference to an uploaded file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    #[validate(url(message = "Upload a file first"))]
    pub url: String,
}

/// Type-specific content of a QR code, one variant per [`ContentType`].
///
/// Serialises as the bare variant struct; the content type travels next to
/// it (see [`QrPayload::from_parts`]).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QrPayload {
    Url(UrlPayload),
    Email(EmailPayload),
    Sms(SmsPayload),
    Phone(PhonePayload),
    Youtube(YoutubePayload),
    Whatsapp(WhatsappPayload),
    Location(LocationPayload),
    Upi(UpiPayload),
    Text(TextPayload),
    Image(FilePayload),
    Pdf(FilePayload),
    Audio(FilePayload),
}

impl QrPayload {
    /// Blank form state for a freshly selected type.
    pub fn empty(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Url => QrPayload::Url(UrlPayload::default()),
            ContentType::Email => QrPayload::Email(EmailPayload::default()),
            ContentType::Sms => QrPayload::Sms(SmsPayload::default()),
            ContentType::Phone => QrPayload::Phone(PhonePayload::default()),
            ContentType::Youtube => QrPayload::Youtube(YoutubePayload::default()),
            ContentType::Whatsapp => QrPayload::Whatsapp(WhatsappPayload::default()),
            ContentType::Location => QrPayload::Location(LocationPayload::default()),
            ContentType::Upi => QrPayload::Upi(UpiPayload::default()),
            ContentType::Text => QrPayload::Text(TextPayload::default()),
            ContentType::Image => QrPayload::Image(FilePayload::default()),
            ContentType::Pdf => QrPayload::Pdf(FilePayload::default()),
            ContentType::Audio => QrPayload::Audio(FilePayload::default()),
        }
    }

    /// Decodes the payload object that accompanies `content_type`.
    pub fn from_parts(
        content_type: ContentType,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        use serde_json::from_value;

        Ok(match content_type {
            ContentType::Url => QrPayload::Url(from_value(payload)?),
            ContentType::Email => QrPayload::Email(from_value(payload)?),
            ContentType::Sms => QrPayload::Sms(from_value(payload)?),
            ContentType::Phone => QrPayload::Phone(from_value(payload)?),
            ContentType::Youtube => QrPayload::Youtube(from_value(payload)?),
            ContentType::Whatsapp => QrPayload::Whatsapp(from_value(payload)?),
            ContentType::Location => QrPayload::Location(from_value(payload)?),
            ContentType::Upi => QrPayload::Upi(from_value(payload)?),
            ContentType::Text => QrPayload::Text(from_value(payload)?),
            ContentType::Image => QrPayload::Image(from_value(payload)?),
            ContentType::Pdf => QrPayload::Pdf(from_value(payload)?),
            ContentType::Audio => QrPayload::Audio(from_value(payload)?),
        })
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            QrPayload::Url(_) => ContentType::Url,
            QrPayload::Email(_) => ContentType::Email,
            QrPayload::Sms(_) => ContentType::Sms,
            QrPayload::Phone(_) => ContentType::Phone,
            QrPayload::Youtube(_) => ContentType::Youtube,
            QrPayload::Whatsapp(_) => ContentType::Whatsapp,
            QrPayload::Location(_) => ContentType::Location,
            QrPayload::Upi(_) => ContentType::Upi,
            QrPayload::Text(_) => ContentType::Text,
            QrPayload::Image(_) => ContentType::Image,
            QrPayload::Pdf(_) => ContentType::Pdf,
            QrPayload::Audio(_) => ContentType::Audio,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            QrPayload::Url(p) => p.validate(),
            QrPayload::Email(p) => p.validate(),
            QrPayload::Sms(p) => p.validate(),
            QrPayload::Phone(p) => p.validate(),
            QrPayload::Youtube(p) => p.validate(),
            QrPayload::Whatsapp(p) => p.validate(),
            QrPayload::Location(p) => p.validate(),
            QrPayload::Upi(p) => p.validate(),
            QrPayload::Text(p) => p.validate(),
            QrPayload::Image(p) | QrPayload::Pdf(p) | QrPayload::Audio(p) => p.validate(),
        }
    }

    /// Uploaded file reference for IMAGE / PDF / AUDIO payloads.
    pub fn file_url_mut(&mut self) -> Option<&mut String> {
        match self {
            QrPayload::Image(p) | QrPayload::Pdf(p) | QrPayload::Audio(p) => Some(&mut p.url),
            _ => None,
        }
    }

    /// The literal string a static QR code encodes.
    pub fn encode(&self) -> String {
        match self {
            QrPayload::Url(p) => p.url.clone(),
            QrPayload::Youtube(p) => p.url.clone(),
            QrPayload::Image(p) | QrPayload::Pdf(p) | QrPayload::Audio(p) => p.url.clone(),
            QrPayload::Text(p) => p.text.clone(),
            QrPayload::Email(p) => {
                let query = query_string(&[
                    ("subject", Some(p.subject.as_str())),
                    ("body", Some(p.body.as_str())),
                ]);
                if query.is_empty() {
                    format!("mailto:{}", p.email)
                } else {
                    format!("mailto:{}?{}", p.email, query)
                }
            }
            QrPayload::Sms(p) => format!("SMSTO:{}:{}", p.phone, p.message),
            QrPayload::Phone(p) => format!("tel:{}", p.phone),
            QrPayload::Whatsapp(p) => {
                let base = format!("https://wa.me/{}", digits_only(&p.phone));
                if p.message.is_empty() {
                    base
                } else {
                    format!("{}?text={}", base, percent_encode(&p.message))
                }
            }
            QrPayload::Location(p) => {
                let base = format!("geo:{},{}", p.latitude, p.longitude);
                match p.query.as_deref() {
                    Some(q) if !q.is_empty() => format!("{}?q={}", base, percent_encode(q)),
                    _ => base,
                }
            }
            QrPayload::Upi(p) => {
                let amount = p.amount.map(|a| format!("{:.2}", a));
                let query = query_string(&[
                    ("pa", Some(p.upi_id.as_str())),
                    ("pn", p.payee_name.as_deref()),
                    ("am", amount.as_deref()),
                    ("tn", p.note.as_deref()),
                    ("cu", Some("INR")),
                ]);
                format!("upi://pay?{}", query)
            }
        }
    }
}
