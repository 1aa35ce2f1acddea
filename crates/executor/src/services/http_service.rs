use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use serde_json::json;
use tracing::{error, info};

use crate::services::execution_service::ExecutionService;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[get("/signals")]
async fn list_signals(service: web::Data<ExecutionService>) -> impl Responder {
    HttpResponse::Ok().json(service.store().list().await)
}

#[post("/signals/generate")]
async fn generate_signal(service: web::Data<ExecutionService>) -> impl Responder {
    match service.execute_cycle().await {
        Ok(entry) => HttpResponse::Created().json(entry),
        Err(e) => {
            error!("Signal generation failed: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to generate signal" }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(list_signals)
        .service(generate_signal);
}

pub async fn serve(service: Arc<ExecutionService>, host: &str, port: u16) -> std::io::Result<()> {
    let data = web::Data::from(service);

    info!("HTTP server listening on {}:{}", host, port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((host, port))?
        .run()
        .await
}
