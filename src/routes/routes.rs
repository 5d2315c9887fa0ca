use actix_web::web;

use crate::handlers::health_handlers::health_check;
use crate::handlers::page_handlers::page_preview;
use crate::handlers::preview_handlers::{export_qr, preview_qr};
use crate::handlers::qr_handlers::{delete_qr_code, list_qr_codes, qr_preview_svg, toggle_pause};
use crate::handlers::redirect_handlers::{open_qr_link, redirect_qr};
use crate::middlewares::authmw::SessionGuard;

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // Printed in every dynamic code; public
    cfg.route("/qr/{short_code}", web::get().to(redirect_qr));
    cfg.route("/page/{short_code}", web::get().to(page_preview));
    cfg.service(
        web::scope("/qrcodes")
            .wrap(SessionGuard)
            .route("/link/{id}", web::get().to(open_qr_link)),
    );
    cfg.service(
        web::scope("/api")
            .route("/health/check", web::get().to(health_check))
            .route("/preview", web::post().to(preview_qr))
            .route("/export/{format}", web::post().to(export_qr))
            .service(
                web::scope("/qrcodes")
                    .wrap(SessionGuard)
                    .route("", web::get().to(list_qr_codes))
                    .route("/{id}", web::delete().to(delete_qr_code))
                    .route("/{id}/pause", web::patch().to(toggle_pause))
                    .route("/{id}/preview.svg", web::get().to(qr_preview_svg)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::state::app_state::test_state;

    #[actix_web::test]
    async fn health_check_is_public() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Arc::new(FakeBackend::new())))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health/check").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
    }
}
