use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::infra::http::models::{DataEnvelope, HealthResponse};
use crate::infra::http::state::HttpState;

pub async fn health(State(state): State<HttpState>) -> Response {
    if let Some(db) = state.health.db.as_ref()
        && let Err(err) = db.health_check().await
    {
        let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
        ErrorReport::from_error(
            "infra::http::health",
            StatusCode::SERVICE_UNAVAILABLE,
            &err,
        )
        .attach(&mut response);
        return response;
    }

    Json(DataEnvelope::new(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache: state.health.cache_enabled,
        rate_limit: state.rate_limiter.is_some(),
    }))
    .into_response()
}
