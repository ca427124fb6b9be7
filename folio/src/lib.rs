pub mod folio;
pub mod handlers;

use std::io;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use log::{error, info};

use crate::folio::config::SiteConfig;
use crate::handlers::AppState;

pub async fn run() -> io::Result<()> {
    let config = SiteConfig::load();
    let server_cfg = config.server.clone();

    let state = match AppState::new(config) {
        Ok(state) => web::Data::new(state),
        Err(err) => {
            error!("failed to initialise the article pipeline: {err:#}");
            return Err(io::Error::other(err.to_string()));
        }
    };

    info!(
        "Folio is listening on: http://{}:{}",
        server_cfg.host, server_cfg.port
    );
    let cors_origins = server_cfg.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .wrap(build_cors(&cors_origins))
            .configure(handlers::config)
    })
    .bind((server_cfg.host.as_str(), server_cfg.port))?
    .run()
    .await
}

pub fn build_cors(origins: &[String]) -> Cors {
    let base = Cors::default()
        .allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_any_origin();
    }

    origins
        .iter()
        .fold(base, |c, origin| c.allowed_origin(origin))
}
