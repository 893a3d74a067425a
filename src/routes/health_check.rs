use actix_web::HttpResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::response::ApiResponse;

#[derive(Serialize)]
pub struct HealthStatus {
    pub timestamp: DateTime<Utc>,
}

pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(ApiResponse::success(
        "API is healthy",
        HealthStatus {
            timestamp: Utc::now(),
        },
    ))
}
