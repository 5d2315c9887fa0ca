use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;

use qrcraft::client::api::ApiClient;
use qrcraft::config::AppConfig;
use qrcraft::routes::routes::init_routes;
use qrcraft::state::app_state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let backend = ApiClient::new(&config.backend_url).context("Could not build HTTP client")?;
    log::info!("Using backend at {}", backend.base_url());

    let bind = (config.bind_address.clone(), config.port);
    let app_state = web::Data::new(AppState::new(Arc::new(backend), config));

    log::info!("Listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        let cors = app_state
            .config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::ACCEPT])
            .allowed_header(http::header::CONTENT_TYPE)
            .expose_headers(vec![http::header::ETAG, http::header::CONTENT_DISPOSITION])
            .max_age(3600);
        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind(bind)
    .context("Could not bind server address")?
    .run()
    .await
    .context("Server stopped with an error")
}
