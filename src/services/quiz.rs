use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use serde::Serialize;
use serde_json::Value;

use super::preference::{AnsweredQuestion, PreferenceScorer};
use crate::ai::{DashscopeClient, FragranceClassifier};
use crate::catalog::{generate_final_stage, Catalog, QuestionGroup, StageQuestion};
use crate::db::{AnswerInput, AnswerModel, AuthUser, Db, SessionModel, SessionSummary, StageAdvance};
use crate::error::{QuizError, QuizResult};
use crate::names;
use crate::scoring::Preferences;

// ---------------------------------------------------------------------------
// Answer values
// ---------------------------------------------------------------------------

/// Stored text form of an answer value. Strings are kept verbatim, every
/// other JSON value is stored as compact JSON.
pub fn encode_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn decode_value(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(raw) if raw.starts_with('[') || raw.starts_with('{') => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        Some(raw) => Value::String(raw.to_string()),
    }
}

/// Scalar items of a decoded value: one per array element, one for a
/// scalar, none for null or an empty string.
pub(crate) fn value_items(value: &Value) -> Vec<String> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}

/// One answer as sent by a client.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub value: Value,
    pub text: Option<String>,
}

impl AnswerSubmission {
    /// Accepts either a bare value or an object of the form
    /// `{"value": .., "text": ..}`.
    pub fn from_payload(question_id: impl Into<String>, payload: Value) -> Self {
        let question_id = question_id.into();
        match payload {
            Value::Object(mut fields)
                if !fields.is_empty() && fields.keys().all(|k| k == "value" || k == "text") =>
            {
                let value = fields.remove("value").unwrap_or(Value::Null);
                let text = match fields.remove("text") {
                    Some(Value::String(text)) => Some(text),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                Self {
                    question_id,
                    value,
                    text,
                }
            }
            value => Self {
                question_id,
                value,
                text: None,
            },
        }
    }

    fn to_input(&self) -> AnswerInput {
        AnswerInput {
            question_id: self.question_id.clone(),
            value: encode_value(&self.value),
            text: self.text.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct AnswerView {
    pub question_id: String,
    pub value: Value,
    pub text: Option<String>,
    pub part: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AnswerModel> for AnswerView {
    fn from(answer: AnswerModel) -> Self {
        Self {
            value: decode_value(answer.value.as_deref()),
            question_id: answer.question_id,
            text: answer.text,
            part: answer.part,
            created_at: answer.created_at,
            updated_at: answer.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: SessionModel,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Serialize)]
pub struct IncompleteStatus {
    pub has_incomplete: bool,
    pub session: Option<SessionModel>,
    pub answers_count: i64,
    pub total_questions: usize,
}

#[derive(Debug, Serialize)]
pub struct PhasedQuestions {
    pub part: i64,
    pub title: String,
    pub description: String,
    pub questions: Vec<StageQuestion>,
}

/// Result of an accepted stage submission.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The next static stage is ready.
    Advanced {
        session: SessionModel,
        next_part: i64,
        group: QuestionGroup,
    },
    /// Preferences were derived and the final stage generated from them.
    Scored {
        session: SessionModel,
        next_part: i64,
        main_fragrance: String,
        secondary_fragrance: String,
        questions: Vec<StageQuestion>,
    },
    Completed { session: SessionModel },
}

impl StageOutcome {
    pub fn session(&self) -> &SessionModel {
        match self {
            StageOutcome::Advanced { session, .. }
            | StageOutcome::Scored { session, .. }
            | StageOutcome::Completed { session } => session,
        }
    }
}

// ---------------------------------------------------------------------------
// QuizService
// ---------------------------------------------------------------------------

pub struct QuizService<C: FragranceClassifier = DashscopeClient> {
    db: Db,
    catalog: Arc<Catalog>,
    scorer: PreferenceScorer<C>,
}

impl<C: FragranceClassifier + Clone> Clone for QuizService<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            catalog: self.catalog.clone(),
            scorer: self.scorer.clone(),
        }
    }
}

impl<C: FragranceClassifier> QuizService<C> {
    pub fn new(db: Db, catalog: Arc<Catalog>, scorer: PreferenceScorer<C>) -> Self {
        Self { db, catalog, scorer }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(super) fn db(&self) -> &Db {
        &self.db
    }

    // ----- sessions -----

    pub async fn create_session(&self, user: &AuthUser) -> QuizResult<SessionModel> {
        Ok(self.db.create_session(user.id).await?)
    }

    /// A session visible to `user`: their own, or any session for an admin.
    pub async fn get_session(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionModel> {
        let session = self
            .db
            .get_session(session_id)
            .await?
            .filter(|s| s.user_id == user.id || user.is_admin)
            .ok_or_else(|| QuizError::not_found(format!("session {session_id}")))?;

        Ok(session)
    }

    pub async fn session_detail(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionDetail> {
        let session = self.get_session(user, session_id).await?;
        let answers = self.db.get_answers(session.id, None).await?;

        Ok(SessionDetail {
            session,
            answers: answers.into_iter().map(AnswerView::from).collect(),
        })
    }

    pub async fn complete_session(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionModel> {
        let session = self.in_progress_session(user, session_id).await?;
        self.db
            .complete_session(&session)
            .await?
            .ok_or_else(|| not_in_progress(session_id))
    }

    pub async fn abandon_session(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionModel> {
        let session = self.in_progress_session(user, session_id).await?;
        self.db
            .abandon_session(session.id)
            .await?
            .ok_or_else(|| not_in_progress(session_id))
    }

    pub async fn delete_session(&self, user: &AuthUser, session_id: &str) -> QuizResult<()> {
        let session = self.in_progress_session(user, session_id).await?;
        if !self.db.delete_session(session.id).await? {
            return Err(not_in_progress(session_id));
        }
        Ok(())
    }

    pub async fn history(&self, user: &AuthUser, limit: Option<i64>) -> QuizResult<Vec<SessionSummary>> {
        let limit = limit
            .unwrap_or(names::DEFAULT_HISTORY_LIMIT)
            .clamp(1, names::MAX_HISTORY_LIMIT);
        Ok(self.db.list_sessions(user.id, limit).await?)
    }

    pub async fn check_incomplete(&self, user: &AuthUser) -> QuizResult<IncompleteStatus> {
        let session = self.db.find_incomplete_session(user.id).await?;
        let answers_count = match &session {
            Some(session) => self.db.answers_count(session.id).await?,
            None => 0,
        };

        Ok(IncompleteStatus {
            has_incomplete: session.is_some(),
            session,
            answers_count,
            total_questions: self.catalog.question_count(),
        })
    }

    async fn in_progress_session(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionModel> {
        let session = self.get_session(user, session_id).await?;
        if !session.is_in_progress() {
            return Err(not_in_progress(session_id));
        }
        Ok(session)
    }

    // ----- answers -----

    pub async fn save_answer(
        &self,
        user: &AuthUser,
        session_id: &str,
        answer: &AnswerSubmission,
    ) -> QuizResult<AnswerView> {
        let session = self.get_session(user, session_id).await?;
        if !self.catalog.contains_question(&answer.question_id) {
            return Err(QuizError::not_found(format!("question {}", answer.question_id)));
        }

        let stored = self
            .db
            .upsert_answer(session.id, &answer.to_input())
            .await?
            .ok_or_else(|| QuizError::not_found(format!("in-progress session {session_id}")))?;

        Ok(stored.into())
    }

    pub async fn answers(
        &self,
        user: &AuthUser,
        session_id: &str,
        stages: Option<&[i64]>,
    ) -> QuizResult<Vec<AnswerView>> {
        let session = self.get_session(user, session_id).await?;
        let answers = self.db.get_answers(session.id, stages).await?;
        Ok(answers.into_iter().map(AnswerView::from).collect())
    }

    // ----- stages -----

    /// Questions of one stage. The final stage is generated from the
    /// session's stored categories and needs a scored session.
    pub async fn phased_questions(
        &self,
        user: &AuthUser,
        part: i64,
        session_id: Option<&str>,
    ) -> QuizResult<PhasedQuestions> {
        check_stage_number(part)?;
        let group = self.stage_group(part)?;

        let questions = if part == names::FINAL_STAGE {
            let session_id = session_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| QuizError::invalid_input("session_id is required for the final stage"))?;
            let session = self.get_session(user, session_id).await?;
            if !session.has_preferences() {
                return Err(QuizError::invalid_state(format!(
                    "session {session_id} has no fragrance preferences yet"
                )));
            }
            generate_final_stage(group, &session.main_fragrance, &session.secondary_fragrance)
        } else {
            group.questions.iter().cloned().map(StageQuestion::Static).collect()
        };

        Ok(PhasedQuestions {
            part,
            title: group.title.clone(),
            description: group.description.clone(),
            questions,
        })
    }

    /// Accepts the answers of the session's current stage and moves the
    /// session on. Answers to questions of other stages, or to unknown
    /// questions, are skipped.
    pub async fn submit_stage(
        &self,
        user: &AuthUser,
        session_id: &str,
        stage: i64,
        submissions: &[AnswerSubmission],
    ) -> QuizResult<StageOutcome> {
        let session = self.get_session(user, session_id).await?;
        if !session.is_in_progress() {
            return Err(not_in_progress(session_id));
        }
        check_stage_number(stage)?;
        if stage != session.current_part {
            return Err(QuizError::invalid_input(format!(
                "session {session_id} is at stage {}, not {stage}",
                session.current_part
            )));
        }

        let stage_group = self.stage_group(stage)?;
        let (known, skipped): (Vec<_>, Vec<_>) = submissions.iter().partition(|a| {
            self.catalog
                .question(&a.question_id)
                .is_some_and(|q| q.group_id == stage_group.id)
        });
        if !skipped.is_empty() {
            tracing::warn!(
                "skipping {} answer(s) to questions outside stage {stage} in session {session_id}",
                skipped.len()
            );
        }
        let answers: Vec<AnswerInput> = known.iter().map(|a| a.to_input()).collect();

        let next_group = if stage < names::FINAL_STAGE {
            Some(self.stage_group(stage + 1)?)
        } else {
            None
        };

        let preferences = if stage == names::SCORING_STAGE {
            Some(self.derive_preferences(&session, &answers).await?)
        } else {
            None
        };

        let advance = StageAdvance {
            stage,
            answers: &answers,
            preferences: preferences
                .as_ref()
                .map(|p| (p.main.as_str(), p.secondary.as_str())),
            complete: stage == names::FINAL_STAGE,
        };

        let Some(advanced) = self.db.advance_stage(&session, advance).await? else {
            return Err(self.rejected_submission(user, session_id, stage).await);
        };

        let outcome = match (next_group, preferences) {
            (Some(group), Some(preferences)) => StageOutcome::Scored {
                questions: generate_final_stage(group, &preferences.main, &preferences.secondary),
                next_part: advanced.current_part,
                main_fragrance: preferences.main,
                secondary_fragrance: preferences.secondary,
                session: advanced,
            },
            (Some(group), None) => StageOutcome::Advanced {
                next_part: advanced.current_part,
                group: group.clone(),
                session: advanced,
            },
            (None, _) => StageOutcome::Completed { session: advanced },
        };

        Ok(outcome)
    }

    /// Scores the stored answers of the first three stages, with the answers
    /// being submitted taking precedence.
    async fn derive_preferences(
        &self,
        session: &SessionModel,
        submitted: &[AnswerInput],
    ) -> QuizResult<Preferences> {
        let stages: Vec<i64> = (names::FIRST_STAGE..=names::SCORING_STAGE).collect();
        let stored = self.db.get_answers(session.id, Some(&stages)).await?;

        let mut merged: HashMap<String, AnswerInput> = stored
            .into_iter()
            .map(|a| {
                let input = AnswerInput {
                    question_id: a.question_id.clone(),
                    value: a.value,
                    text: a.text,
                };
                (a.question_id, input)
            })
            .collect();
        for answer in submitted {
            merged.insert(answer.question_id.clone(), answer.clone());
        }

        let mut ordered: Vec<AnswerInput> = merged.into_values().collect();
        ordered.sort_by(|a, b| {
            let pa = self.catalog.position(&a.question_id);
            let pb = self.catalog.position(&b.question_id);
            pa.cmp(&pb).then_with(|| a.question_id.cmp(&b.question_id))
        });

        let answered: Vec<AnsweredQuestion> = ordered
            .iter()
            .filter_map(|answer| self.answered_question(answer))
            .collect();

        let preferences = self.scorer.score(&answered).await;
        tracing::info!(
            "session {} scored from {} answer(s): main={} secondary={}",
            session.session_id,
            answered.len(),
            preferences.main,
            preferences.secondary
        );
        Ok(preferences)
    }

    fn answered_question(&self, answer: &AnswerInput) -> Option<AnsweredQuestion> {
        let question = self.catalog.question(&answer.question_id)?;
        let value = decode_value(answer.value.as_deref());
        Some(AnsweredQuestion {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            kind: question.kind,
            choices: self.option_labels(&question.id, &value),
            text: answer.text.clone(),
        })
    }

    /// Labels of the chosen options, falling back to the raw value for
    /// values that are not catalog options.
    pub(crate) fn option_labels(&self, question_id: &str, value: &Value) -> Vec<String> {
        value_items(value)
            .into_iter()
            .map(|item| match self.catalog.option(question_id, &item) {
                Some(option) => option.label.clone(),
                None => item,
            })
            .collect()
    }

    fn stage_group(&self, stage: i64) -> QuizResult<&QuestionGroup> {
        self.catalog
            .stage_group(stage)
            .ok_or_else(|| QuizError::not_found(format!("question group for stage {stage}")))
    }

    /// Explains why a stage move lost its compare-and-set.
    async fn rejected_submission(&self, user: &AuthUser, session_id: &str, stage: i64) -> QuizError {
        match self.get_session(user, session_id).await {
            Ok(current) if !current.is_in_progress() => not_in_progress(session_id),
            Ok(current) => QuizError::invalid_input(format!(
                "session {session_id} is at stage {}, not {stage}",
                current.current_part
            )),
            Err(QuizError::NotFound(what)) => {
                QuizError::Internal(eyre!("{what} disappeared during stage submission"))
            }
            Err(e) => e,
        }
    }
}

fn check_stage_number(stage: i64) -> QuizResult<()> {
    if !(names::FIRST_STAGE..=names::FINAL_STAGE).contains(&stage) {
        return Err(QuizError::invalid_input(format!(
            "stage must be between {} and {}, got {stage}",
            names::FIRST_STAGE,
            names::FINAL_STAGE
        )));
    }
    Ok(())
}

fn not_in_progress(session_id: &str) -> QuizError {
    QuizError::invalid_state(format!("session {session_id} is not in progress"))
}
