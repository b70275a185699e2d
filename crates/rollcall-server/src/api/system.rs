//! Registry-level endpoints
//!
//! - GET /stats - Aggregate counters over all nodes
//! - GET /healthz - Liveness of the registry itself

use actix_web::{HttpResponse, get, web};
use tracing::warn;

use crate::{
    error::AppError,
    model::{AppState, response::Health},
};

#[get("/stats")]
pub async fn stats(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = data.registry.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// 200 when the node store answers, 503 otherwise
#[get("/healthz")]
pub async fn healthz(data: web::Data<AppState>) -> HttpResponse {
    match data.registry.health_check().await {
        Ok(()) => HttpResponse::Ok().json(Health {
            status: "ok",
            error: None,
        }),
        Err(e) => {
            warn!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(Health {
                status: "unavailable",
                error: Some(e.to_string()),
            })
        }
    }
}
