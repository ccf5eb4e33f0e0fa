use crate::error::{AppError, Result};
use crate::identity::Owner;
use crate::model::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use tracing::debug;

fn created_or_conflict(conflict: bool) -> StatusCode {
    if conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// `GET /{id}`: temporary redirect to the original URL.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Redirect> {
    let original_url = state.shortener().resolve(&short_code).await?;
    debug!(%short_code, %original_url, "redirecting");
    Ok(Redirect::temporary(&original_url))
}

/// `POST /`: the body is the URL, the response body is the short URL.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    body: String,
) -> Result<Response> {
    let shortened = state.shortener().shorten(&body, &owner.id).await?;

    Ok((
        created_or_conflict(shortened.conflict),
        [
            (CONTENT_TYPE, "text/plain".to_string()),
            (LOCATION, shortened.short_url.clone()),
        ],
        shortened.short_url,
    )
        .into_response())
}

pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    body: Bytes,
) -> Result<Response> {
    let request: ShortenRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let shortened = state.shortener().shorten(&request.url, &owner.id).await?;

    Ok((
        created_or_conflict(shortened.conflict),
        [(LOCATION, shortened.short_url.clone())],
        Json(ShortenResponse {
            result: shortened.short_url,
        }),
    )
        .into_response())
}

/// Shortens several URLs. On a conflict the response is 409 and lists the
/// items processed up to and including the conflicting one.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    body: Bytes,
) -> Result<Response> {
    let items: Vec<BatchRequestItem> =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .shortener()
        .shorten_batch(items.into_iter().map(Into::into).collect(), &owner.id)
        .await?;

    let results: Vec<BatchResponseItem> = outcome.results.into_iter().map(Into::into).collect();
    Ok((created_or_conflict(outcome.conflict), Json(results)).into_response())
}
