use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::error::AppError;
use crate::models::payload::ContentType;
use crate::state::app_state::AppState;
use crate::structs::redirect::PagePreview;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageResponse<'a> {
    short_code: &'a str,
    name: Option<&'a str>,
    content_type: ContentType,
    preview: PagePreview,
}

/// `GET /page/{short_code}`: content shown in-app instead of navigated to.
pub async fn page_preview(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let short_code = path.into_inner();
    let record = state.backend.public_qr(&short_code).await?;

    if !record.accepts_scans() {
        return Err(AppError::Backend {
            status: 423,
            message: "This QR code is paused".to_string(),
        });
    }

    let preview = PagePreview::from_payload(&record.payload).ok_or_else(|| {
        AppError::NotFound(format!("{} codes have no preview page", record.content_type()))
    })?;

    Ok(HttpResponse::Ok().json(PageResponse {
        short_code: &record.short_code,
        name: record.name.as_deref(),
        content_type: record.content_type(),
        preview,
    }))
}
