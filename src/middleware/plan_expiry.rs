//! Per-request plan expiry sweep.
//!
//! Lapsed paid plans are downgraded before any unit of externally
//! visible work, so no request ever observes a company with an expired
//! plan still holding paid entitlements. The sweep is one bulk UPDATE
//! and runs on the hot path; a sweep failure is logged but never fails
//! the request it precedes.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use chrono::Utc;

use crate::db::{queries, AppState};

pub async fn sweep_expired_plans(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.db.get() {
        Ok(conn) => match queries::downgrade_expired_plans(&conn, Utc::now().timestamp()) {
            Ok(count) if count > 0 => {
                tracing::info!("downgraded {} companies with lapsed plans", count);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("plan expiry sweep failed: {}", e),
        },
        Err(e) => tracing::warn!("plan expiry sweep skipped, no db connection: {}", e),
    }

    next.run(request).await
}
