use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use image::RgbaImage;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::style::StyleConfig;
use crate::render::engine::StyledEngine;
use crate::render::{
    Download, ExportError, ExportFormat, PngPdfWriter, QrEngine, RenderError, RenderOptions,
    export_file,
};
use crate::state::app_state::AppState;
use crate::structs::qr_request::PreviewRequest;
use crate::utils::hash::content_hash;

/// Parses a logo URL and refuses anything outside the configured asset
/// origins, so previews never reach arbitrary hosts.
pub(crate) fn checked_logo_url(config: &AppConfig, raw: &str) -> Result<reqwest::Url, AppError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|_| AppError::BadRequest("Logo URL is not a valid URL".to_string()))?;
    if !config.is_asset_url(&url) {
        log::warn!("Refusing logo from {}", url.origin().ascii_serialization());
        return Err(AppError::BadRequest(
            "Logo must be an uploaded image".to_string(),
        ));
    }
    Ok(url)
}

/// Fetches and decodes the style's logo. A logo on a foreign origin is an
/// error; one that cannot be loaded is left out rather than failing the render.
pub(crate) async fn load_logo(
    state: &AppState,
    style: &StyleConfig,
) -> Result<Option<Arc<RgbaImage>>, AppError> {
    let Some(raw) = style.logo_image_url.as_deref() else {
        return Ok(None);
    };
    let url = checked_logo_url(&state.config, raw)?;

    let bytes = match state.backend.fetch_asset(url.as_str()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Could not fetch logo {}: {}", url, e);
            return Ok(None);
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(logo) => Ok(Some(Arc::new(logo.to_rgba8()))),
        Err(e) => {
            log::warn!("Could not decode logo {}: {}", url, e);
            Ok(None)
        }
    }
}

/// Renders on the blocking pool.
pub(crate) async fn render_svg(options: RenderOptions) -> Result<String, AppError> {
    let svg = web::block(move || -> Result<String, RenderError> {
        StyledEngine::new(&options)?.svg()
    })
    .await??;
    Ok(svg)
}

/// SVG body with a content-hash ETag; `304` when the client already has it.
pub(crate) fn svg_response(req: &HttpRequest, svg: String) -> HttpResponse {
    let etag = format!("\"{}\"", content_hash(svg.as_bytes()));
    let cached = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);

    if cached {
        return HttpResponse::NotModified()
            .insert_header((header::ETAG, etag))
            .finish();
    }
    HttpResponse::Ok()
        .content_type("image/svg+xml")
        .insert_header((header::ETAG, etag))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(svg)
}

async fn preview_options(state: &AppState, req: PreviewRequest) -> Result<RenderOptions, AppError> {
    req.validate()?;
    let violations = req.style.validate();
    if !violations.is_empty() {
        return Err(violations.into());
    }

    let mut options = RenderOptions::new(
        req.data,
        req.size.unwrap_or(state.config.default_qr_size),
        req.margin.unwrap_or(state.config.default_qr_margin),
        req.style,
    );
    options.logo = load_logo(state, &options.style).await?;
    Ok(options)
}

/// `POST /api/preview`: live preview while the style is being edited.
pub async fn preview_qr(
    state: web::Data<AppState>,
    req: HttpRequest,
    web::Json(body): web::Json<PreviewRequest>,
) -> Result<HttpResponse, AppError> {
    let options = preview_options(&state, body).await?;
    let svg = render_svg(options).await?;
    Ok(svg_response(&req, svg))
}

/// `POST /api/export/{format}`: the same body, delivered as a download.
pub async fn export_qr(
    state: web::Data<AppState>,
    path: web::Path<String>,
    web::Json(body): web::Json<PreviewRequest>,
) -> Result<HttpResponse, AppError> {
    let requested = path.into_inner();
    let format = ExportFormat::parse(&requested)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported export format: {}", requested)))?;
    let options = preview_options(&state, body).await?;

    let margin = options.margin;
    let download = web::block(move || -> Result<Download, ExportError> {
        let engine = StyledEngine::new(&options)?;
        export_file(&engine, format, margin, &PngPdfWriter)
    })
    .await??;

    if download.format() != Some(format) {
        log::warn!("Requested {} export, delivering {}", format, download.file_name);
    }
    Ok(HttpResponse::Ok()
        .content_type(download.content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        ))
        .body(download.bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::routes::routes::init_routes;
    use crate::state::app_state::test_state;

    #[actix_web::test]
    async fn preview_returns_svg_with_etag() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Arc::new(FakeBackend::new())))
                .configure(init_routes),
        )
        .await;

        let body = serde_json::json!({"data": "https://example.com", "size": 200});
        let req = test::TestRequest::post()
            .uri("/api/preview")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let etag = resp.headers().get(header::ETAG).unwrap().clone();
        let svg = test::read_body(resp).await;
        assert!(svg.starts_with(b"<svg"));

        let req = test::TestRequest::post()
            .uri("/api/preview")
            .insert_header((header::IF_NONE_MATCH, etag))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[actix_web::test]
    async fn invalid_style_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Arc::new(FakeBackend::new())))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/preview")
            .set_json(serde_json::json!({
                "data": "hello",
                "style": {"background": {"color": "#12"}}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "BAD_REQUEST");

        let req = test::TestRequest::post()
            .uri("/api/preview")
            .set_json(serde_json::json!({"data": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn export_is_an_attachment() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Arc::new(FakeBackend::new())))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/export/png")
            .set_json(serde_json::json!({"data": "hello", "size": 128}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"qr-code.png\""
        );
        let bytes = test::read_body(resp).await;
        assert_eq!(&bytes[..4], b"\x89PNG");

        let req = test::TestRequest::post()
            .uri("/api/export/gif")
            .set_json(serde_json::json!({"data": "hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn pdf_export_is_a_pdf() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Arc::new(FakeBackend::new())))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/export/pdf")
            .set_json(serde_json::json!({"data": "hello", "size": 128, "margin": 8}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        let bytes = test::read_body(resp).await;
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[actix_web::test]
    async fn logo_from_a_foreign_host_is_never_fetched() {
        let backend = Arc::new(FakeBackend::new());
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        for logo in [
            "http://169.254.169.254/latest/meta-data/",
            "http://localhost:6379/",
            "https://cdn.example.com.evil.test/logo.png",
            "file:///etc/passwd",
            "not a url",
        ] {
            for uri in ["/api/preview", "/api/export/png"] {
                let req = test::TestRequest::post()
                    .uri(uri)
                    .set_json(serde_json::json!({
                        "data": "hello",
                        "style": {"logoImageUrl": logo}
                    }))
                    .to_request();
                let resp = test::call_service(&app, req).await;
                assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} {}", uri, logo);
            }
        }
        assert!(!backend.calls().iter().any(|call| call == "fetch_asset"));
    }

    #[actix_web::test]
    async fn uploaded_logo_is_fetched_and_rendered() {
        let logo_url = "https://cdn.example.com/upload/logo/image/logo.png";
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([200, 0, 0, 255])))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let backend = Arc::new(FakeBackend::new());
        backend.insert_asset(logo_url, png);

        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/preview")
            .set_json(serde_json::json!({
                "data": "hello",
                "style": {"logoImageUrl": logo_url}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let svg = test::read_body(resp).await;
        assert!(std::str::from_utf8(&svg).unwrap().contains("<image"));
        assert_eq!(
            backend.calls().iter().filter(|call| *call == "fetch_asset").count(),
            1
        );
    }
}
