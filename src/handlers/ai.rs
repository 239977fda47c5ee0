use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    ai::TextExpander,
    error::QuizError,
    extractors::AuthGuard,
    names,
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(names::EXTEND_TEXT_URL, post(extend_text))
}

#[derive(Deserialize)]
struct ExtendTextBody {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct ExtendTextResponse {
    extended_text: String,
}

async fn extend_text(
    AuthGuard(_user): AuthGuard,
    State(state): State<AppState>,
    body: Result<Json<ExtendTextBody>, JsonRejection>,
) -> Result<Json<ExtendTextResponse>, AppError> {
    let Json(body) = body.reject_input("invalid request body")?;
    let text = body.text.trim();
    if text.is_empty() {
        return Err(QuizError::invalid_input("text must not be empty").into());
    }

    let extended_text = state.ai.expand(text).await.map_err(QuizError::from)?;
    Ok(Json(ExtendTextResponse { extended_text }))
}
