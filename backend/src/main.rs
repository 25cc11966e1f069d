use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use std::env;
use std::sync::Arc;
use tryon_backend::config::{AppConfig, StagingStrategy};
use tryon_backend::predictor::GradioPredictor;
use tryon_backend::relay::TryOnRelay;
use tryon_backend::routes::configure_routes;
use tryon_backend::storage::build_stager;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let scratch_dir = if config.staging == StagingStrategy::TempDir {
        std::fs::create_dir_all(&config.scratch_dir)?;
        log::info!("Staging uploads in {}", config.scratch_dir.display());
        Some(config.scratch_dir.clone())
    } else {
        None
    };

    let stager = build_stager(&config)
        .await
        .map_err(|e| startup_error("Failed to set up staging", e))?;
    let predictor = GradioPredictor::new(config.predictor.clone())
        .map_err(|e| startup_error("Failed to build predictor client", e))?;

    log::info!(
        "Relaying to {} ({}) with {} staging",
        config.predictor.space,
        config
            .predictor
            .base_url
            .as_deref()
            .unwrap_or("resolved via hub"),
        stager.name()
    );

    let relay = web::Data::new(
        TryOnRelay::new(stager, Arc::new(predictor), config.max_upload_bytes)
            .with_predictor_timeout(config.predictor.timeout),
    );

    let bind_address = config.bind_address();
    let frontend_dir = config.frontend_dir.clone();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(relay.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone(), scratch_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
