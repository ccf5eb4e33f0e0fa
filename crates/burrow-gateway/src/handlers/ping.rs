use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::warn;

pub async fn ping_handler(State(state): State<AppState>) -> StatusCode {
    match state.shortener().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            warn!(error = %err, "storage ping failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
