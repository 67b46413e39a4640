//! HTTP handlers for the billing API

pub mod billing;
pub mod fee;
pub mod invoice;

use actix_web::{web, HttpResponse};

/// Health check endpoint
///
/// GET /api/v1/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "paygate-billing",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure all billing routes under a `/billing` scope
pub fn configure_billing(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/billing")
            .configure(billing::configure)
            .configure(invoice::configure)
            .configure(fee::configure),
    );
}
