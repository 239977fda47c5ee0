use color_eyre::eyre::eyre;
use serde::Serialize;
use serde_json::Value;

use super::quiz::{decode_value, QuizService};
use crate::ai::FragranceClassifier;
use crate::catalog::QuestionKind;
use crate::db::{AuthUser, SessionModel, SessionStatus};
use crate::error::{QuizError, QuizResult};

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub question_id: String,
    pub group_id: String,
    pub question_text: String,
    pub question_type: QuestionKind,
    pub part: i64,
    pub value: Value,
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_labels: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub session: SessionModel,
    pub total_answers: usize,
    pub answers: Vec<ReportEntry>,
}

impl<C: FragranceClassifier> QuizService<C> {
    /// Report of a completed session: timing, derived categories and every
    /// answer joined with its question and chosen option labels.
    pub async fn report(&self, user: &AuthUser, session_id: &str) -> QuizResult<SessionReport> {
        let session = self.get_session(user, session_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(QuizError::invalid_state(format!(
                "session {session_id} is not completed"
            )));
        }

        let answers = self.db().get_answers(session.id, None).await?;
        let mut entries = Vec::with_capacity(answers.len());
        for answer in answers {
            let question = self.catalog().question(&answer.question_id).ok_or_else(|| {
                eyre!("answer references question {} missing from the catalog", answer.question_id)
            })?;

            let value = decode_value(answer.value.as_deref());
            let labels = self.option_labels(&question.id, &value);
            let (option_label, option_labels) = if value.is_array() || question.kind.is_multiple() {
                (None, Some(labels))
            } else {
                (labels.into_iter().next(), None)
            };

            entries.push(ReportEntry {
                question_id: answer.question_id,
                group_id: question.group_id.clone(),
                question_text: question.text.clone(),
                question_type: question.kind,
                part: answer.part,
                value,
                text: answer.text,
                option_label,
                option_labels,
            });
        }

        tracing::debug!("report for session {session_id} with {} answer(s)", entries.len());

        Ok(SessionReport {
            total_answers: entries.len(),
            answers: entries,
            session,
        })
    }
}
