use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    extractors::AuthGuard,
    names,
    rejections::{AppError, ResultExt},
    services::quiz::{AnswerSubmission, AnswerView},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(names::SESSION_ANSWERS_URL, get(list_answers).post(save_answer))
}

#[derive(Deserialize)]
struct SaveAnswerBody {
    question_id: String,
    #[serde(default)]
    value: Value,
    text: Option<String>,
}

async fn save_answer(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<SaveAnswerBody>, JsonRejection>,
) -> Result<Json<AnswerView>, AppError> {
    let Json(body) = body.reject_input("invalid request body")?;
    let answer = AnswerSubmission {
        question_id: body.question_id,
        value: body.value,
        text: body.text,
    };

    Ok(Json(state.quiz.save_answer(&user, &session_id, &answer).await?))
}

#[derive(Deserialize)]
struct AnswersQuery {
    /// Comma separated stage numbers.
    part: Option<String>,
}

async fn list_answers(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<AnswersQuery>,
) -> Result<Json<Vec<AnswerView>>, AppError> {
    let stages = query
        .part
        .as_deref()
        .map(|parts| {
            parts
                .split(',')
                .map(|p| p.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .reject_input("invalid part filter")?;

    let answers = state
        .quiz
        .answers(&user, &session_id, stages.as_deref())
        .await?;

    Ok(Json(answers))
}
