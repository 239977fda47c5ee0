// Database model structs

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

#[derive(sqlx::FromRow)]
pub struct GroupRow {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(sqlx::FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub group_id: String,
    pub text: String,
    pub kind: String,
    pub image_range: Option<String>,
    pub images_path: Option<String>,
    pub min_selection: i64,
    pub max_selection: i64,
    pub show_text_when: Option<String>,
    pub sort_order: i64,
}

#[derive(sqlx::FromRow)]
pub struct OptionRow {
    pub question_id: String,
    pub label: String,
    pub value: String,
    pub emoji: Option<String>,
    pub image: Option<String>,
    pub sort_order: i64,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct FragranceCategory {
    pub id: String,
    pub name: String,
    pub english_name: String,
    pub core_trait_1: Option<String>,
    pub core_trait_2: Option<String>,
    pub intensity: Option<i64>,
    pub style_keywords: Option<String>,
    pub image_url: String,
    pub category_type: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct SessionModel {
    #[serde(skip)]
    pub id: i64,
    pub session_id: String,
    #[serde(skip)]
    pub user_id: i64,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub current_part: i64,
    pub main_fragrance: String,
    pub secondary_fragrance: String,
}

impl SessionModel {
    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    pub fn has_preferences(&self) -> bool {
        !self.main_fragrance.is_empty() && !self.secondary_fragrance.is_empty()
    }
}

/// A session row plus its answer count, used by the history listing.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SessionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: SessionModel,
    pub answer_count: i64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct AnswerModel {
    pub question_id: String,
    pub value: Option<String>,
    pub text: Option<String>,
    pub part: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
