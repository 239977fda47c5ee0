use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Question, QuestionGroup},
    db::FragranceCategory,
    error::QuizError,
    extractors::AuthGuard,
    names,
    rejections::{AppError, ResultExt},
    services::quiz::PhasedQuestions,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::QUESTION_GROUPS_URL, get(question_groups))
        .route(names::QUESTION_GROUP_URL, get(question_group))
        .route(names::ALL_QUESTIONS_URL, get(all_questions))
        .route(names::PHASED_QUESTIONS_URL, get(phased_questions))
        .route(names::FRAGRANCE_IMAGES_URL, get(fragrance_images))
}

async fn question_groups(State(state): State<AppState>) -> Json<Vec<QuestionGroup>> {
    Json(state.catalog.groups().to_vec())
}

async fn question_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<QuestionGroup>, AppError> {
    let group = state
        .catalog
        .group(&group_id)
        .ok_or_else(|| QuizError::not_found(format!("question group {group_id}")))?;

    Ok(Json(group.clone()))
}

async fn all_questions(State(state): State<AppState>) -> Json<Vec<Question>> {
    Json(state.catalog.questions().cloned().collect())
}

#[derive(Deserialize)]
struct PhasedQuery {
    part: Option<String>,
    session_id: Option<String>,
}

async fn phased_questions(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Query(query): Query<PhasedQuery>,
) -> Result<Json<PhasedQuestions>, AppError> {
    let part = query
        .part
        .as_deref()
        .unwrap_or("1")
        .parse::<i64>()
        .reject_input("invalid part")?;

    let questions = state
        .quiz
        .phased_questions(&user, part, query.session_id.as_deref())
        .await?;

    Ok(Json(questions))
}

#[derive(Deserialize)]
struct FragranceImagesQuery {
    category_type: Option<String>,
}

#[derive(Serialize)]
struct FragranceImage {
    label: String,
    value: String,
    image: String,
}

impl From<FragranceCategory> for FragranceImage {
    fn from(category: FragranceCategory) -> Self {
        // file stem of the image url
        let label = category
            .image_url
            .rsplit('/')
            .next()
            .and_then(|file| file.split('.').next())
            .unwrap_or_default()
            .to_string();

        Self {
            label,
            value: category.image_url.clone(),
            image: category.image_url,
        }
    }
}

#[derive(Serialize)]
struct FragranceImages {
    category_type: String,
    images: Vec<FragranceImage>,
}

async fn fragrance_images(
    AuthGuard(_user): AuthGuard,
    State(state): State<AppState>,
    Query(query): Query<FragranceImagesQuery>,
) -> Result<Json<FragranceImages>, AppError> {
    let category_type = query
        .category_type
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| QuizError::invalid_input("category_type is required"))?;

    let categories = state
        .db
        .fragrance_categories_by_type(&category_type)
        .await
        .map_err(QuizError::from)?;

    let images = categories
        .into_iter()
        .filter(|c| !c.image_url.is_empty())
        .map(FragranceImage::from)
        .collect();

    Ok(Json(FragranceImages {
        category_type,
        images,
    }))
}
