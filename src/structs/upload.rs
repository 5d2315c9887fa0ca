use serde::Deserialize;

/// Upload endpoints under `/upload/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Logo,
    BlogImage,
    Pdf,
    Audio,
}

impl UploadKind {
    pub fn path(self) -> &'static str {
        match self {
            UploadKind::Image => "upload/image",
            UploadKind::Logo => "upload/logo/image",
            UploadKind::BlogImage => "upload/blog/image",
            UploadKind::Pdf => "upload/pdf",
            UploadKind::Audio => "upload/audio",
        }
    }
}

/// A file picked by the user, ready to send as multipart form data.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub url: String,
}
