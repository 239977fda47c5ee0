use chrono::{DateTime, Utc};
use color_eyre::Result;
use sqlx::SqliteConnection;

use super::models::AnswerModel;
use super::Db;

/// An answer ready to be written: the value is already in its stored text
/// form.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerInput {
    pub question_id: String,
    pub value: Option<String>,
    pub text: Option<String>,
}

impl Db {
    /// Upsert one answer, tagged with the session's current stage. Returns
    /// `None` without writing anything when the session is not in progress.
    pub async fn upsert_answer(
        &self,
        session_id: i64,
        answer: &AnswerInput,
    ) -> Result<Option<AnswerModel>> {
        let now = Utc::now();

        // Single statement: the status check and the write cannot interleave
        // with a concurrent stage submission.
        let stored = sqlx::query_as::<_, AnswerModel>(
            r#"
            INSERT INTO answers (session_id, question_id, value, text, part, created_at, updated_at)
            SELECT id, ?, ?, ?, current_part, ?, ?
            FROM quiz_sessions
            WHERE id = ? AND status = 'in_progress'
            ON CONFLICT(session_id, question_id) DO UPDATE SET
                value = excluded.value,
                text = excluded.text,
                part = excluded.part,
                updated_at = excluded.updated_at
            RETURNING question_id, value, text, part, created_at, updated_at
            "#,
        )
        .bind(&answer.question_id)
        .bind(&answer.value)
        .bind(&answer.text)
        .bind(now)
        .bind(now)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        if stored.is_some() {
            tracing::info!(
                "answer stored for session={session_id} question={}",
                answer.question_id
            );
        }

        Ok(stored)
    }

    /// Answers of a session in catalog order, optionally restricted to the
    /// given stages.
    pub async fn get_answers(
        &self,
        session_id: i64,
        stages: Option<&[i64]>,
    ) -> Result<Vec<AnswerModel>> {
        let answers = sqlx::query_as::<_, AnswerModel>(
            r#"
            SELECT a.question_id, a.value, a.text, a.part, a.created_at, a.updated_at
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE a.session_id = ?
            ORDER BY q.group_id, q.sort_order, q.id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(match stages {
            Some(stages) => answers
                .into_iter()
                .filter(|a| stages.contains(&a.part))
                .collect(),
            None => answers,
        })
    }

    pub async fn answers_count(&self, session_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Upsert inside an open transaction with an explicit stage tag.
pub(super) async fn upsert_answer_tx(
    conn: &mut SqliteConnection,
    session_id: i64,
    answer: &AnswerInput,
    part: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO answers (session_id, question_id, value, text, part, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id, question_id) DO UPDATE SET
            value = excluded.value,
            text = excluded.text,
            part = excluded.part,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(session_id)
    .bind(&answer.question_id)
    .bind(&answer.value)
    .bind(&answer.text)
    .bind(part)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}
