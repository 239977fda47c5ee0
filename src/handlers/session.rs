use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    db::{SessionModel, SessionSummary},
    error::QuizError,
    extractors::AuthGuard,
    names,
    rejections::{AppError, ResultExt},
    services::{
        quiz::{AnswerSubmission, IncompleteStatus, SessionDetail, StageOutcome},
        report::SessionReport,
    },
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::SESSIONS_URL, get(list_sessions).post(create_session))
        .route(names::CHECK_INCOMPLETE_URL, get(check_incomplete))
        .route(names::SESSION_HISTORY_URL, get(history))
        .route(names::SESSION_URL, get(session_detail).delete(delete_session))
        .route(names::COMPLETE_SESSION_URL, post(complete_session))
        .route(names::ABANDON_SESSION_URL, post(abandon_session))
        .route(names::SESSION_REPORT_URL, get(report))
        .route(names::SUBMIT_PART_URL, post(submit_part))
}

async fn create_session(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.quiz.create_session(&user).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(state.quiz.history(&user, None).await?))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<String>,
}

async fn history(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let limit = query
        .limit
        .as_deref()
        .map(str::parse::<i64>)
        .transpose()
        .reject_input("invalid limit")?;

    Ok(Json(state.quiz.history(&user, limit).await?))
}

async fn check_incomplete(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<Json<IncompleteStatus>, AppError> {
    Ok(Json(state.quiz.check_incomplete(&user).await?))
}

async fn session_detail(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, AppError> {
    Ok(Json(state.quiz.session_detail(&user, &session_id).await?))
}

async fn delete_session(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.quiz.delete_session(&user, &session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_session(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionModel>, AppError> {
    Ok(Json(state.quiz.complete_session(&user, &session_id).await?))
}

async fn abandon_session(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionModel>, AppError> {
    Ok(Json(state.quiz.abandon_session(&user, &session_id).await?))
}

async fn report(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionReport>, AppError> {
    Ok(Json(state.quiz.report(&user, &session_id).await?))
}

#[derive(Deserialize)]
struct SubmitPartBody {
    session_id: Option<String>,
    #[serde(default)]
    answers: Map<String, Value>,
}

async fn submit_part(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path((session_id, part)): Path<(String, String)>,
    body: Result<Json<SubmitPartBody>, JsonRejection>,
) -> Result<Json<StageOutcome>, AppError> {
    let part = part.parse::<i64>().reject_input("invalid part")?;
    let Json(body) = body.reject_input("invalid request body")?;

    if body.session_id.as_deref().is_some_and(|id| id != session_id) {
        return Err(QuizError::invalid_input("session_id does not match the request path").into());
    }

    let submissions: Vec<AnswerSubmission> = body
        .answers
        .into_iter()
        .map(|(question_id, payload)| AnswerSubmission::from_payload(question_id, payload))
        .collect();

    let outcome = state
        .quiz
        .submit_stage(&user, &session_id, part, &submissions)
        .await?;

    Ok(Json(outcome))
}
