pub mod leads;
pub mod payment;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::RateLimits;
use crate::db::AppState;
use crate::rate_limit;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Route tree without rate limiting; used directly by tests.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payment/initiate", post(payment::initiate_payment))
        .route("/payment/callback", post(payment::payment_callback))
        .route("/payment/invoice/{order_id}", get(payment::get_invoice))
        .route(
            "/api/v1/leads",
            post(leads::create_lead).get(leads::list_leads),
        )
}

/// Full public router with per-IP rate limiting tiers.
pub fn router(limits: RateLimits) -> Router<AppState> {
    let initiate = Router::new()
        .route("/payment/initiate", post(payment::initiate_payment))
        .route_layer(rate_limit::strict_layer(limits.strict_rpm));

    let standard = Router::new()
        .route("/payment/callback", post(payment::payment_callback))
        .route("/payment/invoice/{order_id}", get(payment::get_invoice))
        .route(
            "/api/v1/leads",
            post(leads::create_lead).get(leads::list_leads),
        )
        .route_layer(rate_limit::standard_layer(limits.standard_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .route_layer(rate_limit::relaxed_layer(limits.relaxed_rpm));

    Router::new().merge(initiate).merge(standard).merge(relaxed)
}
