//! Route handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::dice::DiceError;
use crate::http::request::RequestContext;
use crate::http::server::AppState;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Dice(#[from] DiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// `GET /rolldice`: a decimal die roll in `1..=6`.
pub async fn roll_dice(
    State(state): State<AppState>,
    Extension(RequestContext(cx)): Extension<RequestContext>,
) -> Result<String, AppError> {
    let value = state.roller.roll(&cx)?;
    Ok(value.to_string())
}
