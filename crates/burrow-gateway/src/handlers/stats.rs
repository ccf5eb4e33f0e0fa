use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use burrow_core::InternalStats;

pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Internal counters, readable only from the trusted subnet.
pub async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InternalStats>> {
    let subnet = state.trusted_subnet().ok_or(AppError::Forbidden)?;

    let real_ip = headers
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Forbidden)?;
    if !subnet.contains_str(real_ip) {
        return Err(AppError::Forbidden);
    }

    Ok(Json(state.shortener().stats().await?))
}
