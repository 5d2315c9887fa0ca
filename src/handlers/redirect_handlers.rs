use actix_web::{HttpResponse, http::header, web};

use crate::error::AppError;
use crate::session::Session;
use crate::state::app_state::AppState;
use crate::structs::redirect::RedirectTarget;
use crate::utils::encode::percent_encode;

fn page_path(short_code: &str) -> String {
    format!("/page/{}", percent_encode(short_code))
}

fn found(location: String) -> Result<HttpResponse, AppError> {
    let value = header::HeaderValue::try_from(location)
        .map_err(|_| AppError::BadRequest("QR data cannot be opened as a link".to_string()))?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, value))
        .finish())
}

/// Where a scan of `short_code` lands.
pub fn scan_destination(short_code: &str, target: &RedirectTarget) -> String {
    if target.content_type.is_displayed_in_app() {
        return page_path(short_code);
    }
    match target.redirect_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => page_path(short_code),
    }
}

/// `GET /qr/{short_code}`: the URL printed in every dynamic code.
///
/// Paused or unknown codes answer with the backend's status and never
/// redirect.
pub async fn redirect_qr(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let short_code = path.into_inner();
    let target = state.backend.resolve_redirect(&short_code).await?;
    let location = scan_destination(&short_code, &target);
    log::info!("Scan of {} ({}) -> {}", short_code, target.content_type, location);
    found(location)
}

/// `GET /qrcodes/link/{id}`: opens one of the user's codes.
///
/// Dynamic codes go through the scan endpoint, so a paused code is refused
/// here the same way it is at `/qr/{short_code}`. Static codes open their
/// encoded data directly.
pub async fn open_qr_link(
    state: web::Data<AppState>,
    session: web::ReqData<Session>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = state.backend.get_qr(&session.token, &id).await?;

    let location = if record.is_dynamic {
        let target = state.backend.resolve_redirect(&record.short_code).await?;
        scan_destination(&record.short_code, &target)
    } else if record.content_type().is_displayed_in_app() {
        page_path(&record.short_code)
    } else {
        record.payload.encode()
    };
    found(location)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use chrono::Utc;

    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::models::payload::{ContentType, EmailPayload, QrPayload, TextPayload};
    use crate::models::qr_record::sample_record;
    use crate::routes::routes::init_routes;
    use crate::state::app_state::test_state;
    use crate::utils::jwt::mint_token;

    fn bearer() -> (header::HeaderName, String) {
        let token = mint_token("owner", Some(Utc::now().timestamp() + 600));
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn displayed_types_go_to_the_page() {
        let target = RedirectTarget {
            content_type: ContentType::Pdf,
            redirect_url: Some("https://cdn.example.com/menu.pdf".into()),
        };
        assert_eq!(scan_destination("abc", &target), "/page/abc");

        let target = RedirectTarget {
            content_type: ContentType::Url,
            redirect_url: Some("https://example.com".into()),
        };
        assert_eq!(scan_destination("abc", &target), "https://example.com");

        let target = RedirectTarget {
            content_type: ContentType::Location,
            redirect_url: None,
        };
        assert_eq!(scan_destination("abc", &target), "/page/abc");
    }

    #[actix_web::test]
    async fn active_code_redirects_and_counts_the_scan() {
        let backend = Arc::new(FakeBackend::new());
        backend.insert(sample_record("qr-1", "menu01", true));
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/qr/menu01").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.com/menu"
        );
        assert_eq!(backend.record("qr-1").unwrap().scan_count, 1);
    }

    #[actix_web::test]
    async fn paused_code_is_refused_without_redirect() {
        let backend = Arc::new(FakeBackend::new());
        let mut record = sample_record("qr-1", "menu01", true);
        record.is_paused = true;
        backend.insert(record);
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/qr/menu01").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 423);
        assert!(resp.headers().get(header::LOCATION).is_none());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "This QR code is paused");
        assert_eq!(backend.record("qr-1").unwrap().scan_count, 0);
    }

    #[actix_web::test]
    async fn unknown_code_is_not_found() {
        let backend = Arc::new(FakeBackend::new());
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/qr/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn link_needs_a_session_and_opens_the_destination() {
        let backend = Arc::new(FakeBackend::new());
        backend.insert(sample_record("qr-1", "menu01", false));
        let mut text = sample_record("qr-2", "note02", false);
        text.payload = QrPayload::Text(TextPayload {
            text: "Hello".into(),
        });
        backend.insert(text);
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/qrcodes/link/qr-1").to_request();
        match test::try_call_service(&app, req).await {
            Ok(_) => panic!("request without a token was let through"),
            Err(err) => assert_eq!(
                err.as_response_error().status_code(),
                StatusCode::UNAUTHORIZED
            ),
        }

        let req = test::TestRequest::get()
            .uri("/qrcodes/link/qr-1")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.com/menu"
        );

        let req = test::TestRequest::get()
            .uri("/qrcodes/link/qr-2")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/page/note02");
    }

    #[actix_web::test]
    async fn link_to_a_paused_dynamic_code_is_refused() {
        let backend = Arc::new(FakeBackend::new());
        let mut record = sample_record("qr-1", "menu01", true);
        record.is_paused = true;
        backend.insert(record);
        backend.insert(sample_record("qr-2", "live02", true));
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/qrcodes/link/qr-1")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 423);
        assert!(resp.headers().get(header::LOCATION).is_none());
        assert_eq!(backend.record("qr-1").unwrap().scan_count, 0);

        let req = test::TestRequest::get()
            .uri("/qrcodes/link/qr-2")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "https://example.com/menu"
        );
        assert_eq!(backend.record("qr-2").unwrap().scan_count, 1);
    }

    #[actix_web::test]
    async fn static_email_link_opens_the_mail_client() {
        let backend = Arc::new(FakeBackend::new());
        let mut record = sample_record("qr-3", "mail03", false);
        record.payload = QrPayload::Email(EmailPayload {
            email: "hi@example.com".into(),
            subject: "Hello there".into(),
            body: String::new(),
        });
        backend.insert(record);
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/qrcodes/link/qr-3")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "mailto:hi@example.com?subject=Hello%20there"
        );
        assert!(!backend.calls().iter().any(|call| call == "resolve_redirect"));
    }
}
