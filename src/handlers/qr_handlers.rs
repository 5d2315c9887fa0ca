use actix_web::{HttpRequest, HttpResponse, web};

use crate::error::AppError;
use crate::handlers::preview_handlers::{load_logo, render_svg, svg_response};
use crate::render::RenderOptions;
use crate::session::Session;
use crate::state::app_state::AppState;
use crate::structs::qr_request::{DeleteQrRequest, QrSearchParams};
use crate::views::qr_list::filter_records;
use crate::views::{DeleteConfirmation, ViewError};

/// `GET /api/qrcodes?search=`: the user's codes, filtered by label.
pub async fn list_qr_codes(
    state: web::Data<AppState>,
    session: web::ReqData<Session>,
    query: web::Query<QrSearchParams>,
) -> Result<HttpResponse, AppError> {
    let records = state.backend.list_user_qrs(&session.token).await?;
    let visible = filter_records(&records, query.search.as_deref().unwrap_or_default());
    Ok(HttpResponse::Ok().json(visible))
}

/// `DELETE /api/qrcodes/{id}` with `{confirmation}` equal to the label.
pub async fn delete_qr_code(
    state: web::Data<AppState>,
    session: web::ReqData<Session>,
    path: web::Path<String>,
    web::Json(body): web::Json<DeleteQrRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = state.backend.get_qr(&session.token, &id).await?;

    let mut confirmation = DeleteConfirmation::new(&record.id, record.display_label());
    confirmation.set_typed(body.confirmation);
    if !confirmation.is_enabled() {
        return Err(ViewError::ConfirmationMismatch.into());
    }

    state.backend.delete_qr(&session.token, &id).await?;
    log::info!("{} deleted QR code {}", session.user.id, id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "id": id })))
}

/// `PATCH /api/qrcodes/{id}/pause`: flips pause on a dynamic code.
pub async fn toggle_pause(
    state: web::Data<AppState>,
    session: web::ReqData<Session>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = state.backend.get_qr(&session.token, &id).await?;
    if !record.can_pause() {
        return Err(ViewError::NotDynamic.into());
    }

    let updated = state.backend.toggle_pause(&session.token, &id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// `GET /api/qrcodes/{id}/preview.svg`: the stored code as printed.
pub async fn qr_preview_svg(
    state: web::Data<AppState>,
    session: web::ReqData<Session>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = state.backend.get_qr(&session.token, &id).await?;

    let mut options = RenderOptions::new(
        record.encoded_data(&state.config.public_origin),
        state.config.default_qr_size,
        state.config.default_qr_margin,
        record.style,
    );
    options.logo = match load_logo(&state, &options.style).await {
        Ok(logo) => logo,
        Err(e) => {
            log::warn!("Stored logo for {} skipped: {}", id, e);
            None
        }
    };

    let svg = render_svg(options).await?;
    Ok(svg_response(&req, svg))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, http::header, test};
    use chrono::Utc;

    use crate::client::fake::FakeBackend;
    use crate::models::qr_record::sample_record;
    use crate::routes::routes::init_routes;
    use crate::state::app_state::test_state;
    use crate::utils::jwt::mint_token;

    fn bearer() -> (header::HeaderName, String) {
        let token = mint_token("owner", Some(Utc::now().timestamp() + 600));
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn seeded() -> Arc<FakeBackend> {
        let backend = Arc::new(FakeBackend::new());
        let mut menu = sample_record("qr-1", "menu01", true);
        menu.name = Some("Lunch Menu".into());
        backend.insert(menu);
        backend.insert(sample_record("qr-2", "flyer2", false));
        backend
    }

    #[actix_web::test]
    async fn list_filters_by_search() {
        let backend = seeded();
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/qrcodes?search=lunch")
            .insert_header(bearer())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["shortCode"], "menu01");

        let req = test::TestRequest::get()
            .uri("/api/qrcodes")
            .insert_header(bearer())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn expired_token_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(seeded()))
                .configure(init_routes),
        )
        .await;

        let token = mint_token("owner", Some(Utc::now().timestamp() - 60));
        let req = test::TestRequest::get()
            .uri("/api/qrcodes")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        match test::try_call_service(&app, req).await {
            Ok(_) => panic!("expired token was let through"),
            Err(err) => assert_eq!(
                err.as_response_error().status_code(),
                StatusCode::UNAUTHORIZED
            ),
        }
    }

    #[actix_web::test]
    async fn delete_requires_the_exact_label() {
        let backend = seeded();
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/api/qrcodes/qr-1")
            .insert_header(bearer())
            .set_json(serde_json::json!({"confirmation": "lunch menu"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(backend.record("qr-1").is_some());

        let req = test::TestRequest::delete()
            .uri("/api/qrcodes/qr-1")
            .insert_header(bearer())
            .set_json(serde_json::json!({"confirmation": "Lunch Menu"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(backend.record("qr-1").is_none());
    }

    #[actix_web::test]
    async fn pause_is_for_dynamic_codes_only() {
        let backend = seeded();
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend.clone()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri("/api/qrcodes/qr-1/pause")
            .insert_header(bearer())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["isPaused"], true);

        let req = test::TestRequest::patch()
            .uri("/api/qrcodes/qr-2/pause")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let toggles = backend.calls().iter().filter(|c| *c == "toggle_pause").count();
        assert_eq!(toggles, 1);
    }

    #[actix_web::test]
    async fn stored_code_preview_encodes_the_redirect_url() {
        let backend = seeded();
        let app = test::init_service(
            App::new()
                .app_data(test_state(backend))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/qrcodes/qr-1/preview.svg")
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
        assert!(resp.headers().contains_key(header::ETAG));
    }
}
