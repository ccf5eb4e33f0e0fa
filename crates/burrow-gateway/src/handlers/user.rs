use crate::error::{AppError, Result};
use crate::identity::Owner;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

pub async fn user_urls_handler(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Response> {
    if !owner.established {
        return Err(AppError::Unauthorized);
    }

    let urls = state.shortener().user_urls(&owner.id).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(urls).into_response())
}

/// Accepts a JSON array of short codes and queues their deletion.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    body: Bytes,
) -> Result<StatusCode> {
    if !owner.established {
        return Err(AppError::Unauthorized);
    }

    let codes: Vec<String> =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    state.shortener().request_deletion(&owner.id, codes).await?;

    Ok(StatusCode::ACCEPTED)
}
