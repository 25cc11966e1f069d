use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::middleware::DefaultHeaders;
use actix_web::{HttpResponse, guard, web};
use log::{error, info};
use serde_json::json;
use shared::{TRY_ON_ENDPOINT, TryOnResponse};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::RelayError;
use crate::relay::{TryOnRelay, read_form};

/// API routes only; the relay must be registered as `web::Data<TryOnRelay>`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(TRY_ON_ENDPOINT).route(web::post().to(handle_try_on)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

/// Serves staged files back to browsers with permissive cross-origin headers.
pub fn configure_scratch(cfg: &mut web::ServiceConfig, scratch_dir: PathBuf) {
    cfg.service(
        web::scope("/tmp")
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "GET, OPTIONS"))
                    .add((
                        "Access-Control-Allow-Headers",
                        "X-Requested-With, Content-Type, Accept",
                    )),
            )
            .service(
                web::resource("/{tail:.*}")
                    .guard(guard::Options())
                    .to(|| async { HttpResponse::NoContent().finish() }),
            )
            .service(Files::new("", scratch_dir)),
    );
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String, scratch_dir: Option<PathBuf>) {
    configure_api(cfg);
    if let Some(scratch_dir) = scratch_dir {
        configure_scratch(cfg, scratch_dir);
    }
    cfg.service(Files::new("/", frontend_dir).index_file("index.html"));
}

async fn handle_try_on(
    relay: web::Data<TryOnRelay>,
    payload: Multipart,
) -> Result<HttpResponse, RelayError> {
    let request_id = Uuid::new_v4();

    let form = read_form(payload, relay.max_upload_bytes()).await.map_err(|e| {
        info!("[{}] rejected upload: {}", request_id, e);
        e
    })?;

    match relay.run(request_id, form).await {
        Ok(result) => {
            info!("[{}] try-on complete", request_id);
            Ok(HttpResponse::Ok().json(TryOnResponse::success(result.result_image_url)))
        }
        Err(RelayError::MissingImages) => {
            info!("[{}] missing person or garment image", request_id);
            Err(RelayError::MissingImages)
        }
        Err(e) => {
            error!("[{}] error processing images: {}", request_id, e);
            Err(e)
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
