use chrono::{DateTime, Utc};
use color_eyre::Result;
use rand::distributions::{Alphanumeric, DistString};

use super::answer::{upsert_answer_tx, AnswerInput};
use super::models::{SessionModel, SessionSummary};
use super::Db;
use crate::names;

const SESSION_COLUMNS: &str = "id, session_id, user_id, status, start_time, end_time, duration_ms, \
     current_part, main_fragrance, secondary_fragrance";

/// One accepted stage submission, applied atomically by [`Db::advance_stage`].
pub struct StageAdvance<'a> {
    pub stage: i64,
    pub answers: &'a [AnswerInput],
    pub preferences: Option<(&'a str, &'a str)>,
    pub complete: bool,
}

fn new_session_id() -> String {
    let token = Alphanumeric.sample_string(&mut rand::thread_rng(), names::SESSION_TOKEN_LEN);
    format!("{}{token}", names::SESSION_ID_PREFIX)
}

fn duration_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds()
}

impl Db {
    /// Starts a new attempt for the user. Any attempt the user still had in
    /// progress is marked abandoned in the same transaction.
    pub async fn create_session(&self, user_id: i64) -> Result<SessionModel> {
        let session_id = new_session_id();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let abandoned = sqlx::query(
            "UPDATE quiz_sessions SET status = 'abandoned' WHERE user_id = ? AND status = 'in_progress'",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let session = sqlx::query_as::<_, SessionModel>(&format!(
            "INSERT INTO quiz_sessions (session_id, user_id, status, start_time, current_part) \
             VALUES (?, ?, 'in_progress', ?, ?) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(&session_id)
        .bind(user_id)
        .bind(now)
        .bind(names::FIRST_STAGE)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if abandoned > 0 {
            tracing::info!("abandoned {abandoned} in-progress session(s) for user_id={user_id}");
        }
        tracing::info!("session created: session_id={session_id}, user_id={user_id}");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>> {
        let session = sqlx::query_as::<_, SessionModel>(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE session_id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Marks an in-progress session completed. Returns `None` when the
    /// session was no longer in progress.
    pub async fn complete_session(&self, session: &SessionModel) -> Result<Option<SessionModel>> {
        let end_time = Utc::now();

        let completed = sqlx::query_as::<_, SessionModel>(&format!(
            "UPDATE quiz_sessions SET status = 'completed', end_time = ?, duration_ms = ? \
             WHERE id = ? AND status = 'in_progress' RETURNING {SESSION_COLUMNS}"
        ))
        .bind(end_time)
        .bind(duration_ms(session.start_time, end_time))
        .bind(session.id)
        .fetch_optional(&self.pool)
        .await?;

        if completed.is_some() {
            tracing::info!("session {} completed", session.session_id);
        }
        Ok(completed)
    }

    pub async fn abandon_session(&self, id: i64) -> Result<Option<SessionModel>> {
        let abandoned = sqlx::query_as::<_, SessionModel>(&format!(
            "UPDATE quiz_sessions SET status = 'abandoned' \
             WHERE id = ? AND status = 'in_progress' RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(session) = &abandoned {
            tracing::info!("session {} abandoned", session.session_id);
        }
        Ok(abandoned)
    }

    /// Deletes an in-progress session and its answers. Returns whether a
    /// row was deleted.
    pub async fn delete_session(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM quiz_sessions WHERE id = ? AND status = 'in_progress'")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!("deleted session {id}: {deleted}");
        Ok(deleted > 0)
    }

    /// Most recent sessions of a user first.
    pub async fn list_sessions(&self, user_id: i64, limit: i64) -> Result<Vec<SessionSummary>> {
        let sessions = sqlx::query_as::<_, SessionSummary>(
            r#"
            SELECT s.id, s.session_id, s.user_id, s.status, s.start_time, s.end_time, s.duration_ms,
                   s.current_part, s.main_fragrance, s.secondary_fragrance,
                   (SELECT COUNT(*) FROM answers a WHERE a.session_id = s.id) AS answer_count
            FROM quiz_sessions s
            WHERE s.user_id = ?
            ORDER BY s.start_time DESC, s.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    pub async fn find_incomplete_session(&self, user_id: i64) -> Result<Option<SessionModel>> {
        let session = sqlx::query_as::<_, SessionModel>(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions \
             WHERE user_id = ? AND status = 'in_progress' \
             ORDER BY start_time DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Applies a stage submission in one transaction: moves the session from
    /// `advance.stage` to the next stage, stores the answers tagged with the
    /// submitted stage, and optionally records preferences and completion.
    ///
    /// The stage move is a compare-and-set on (status, current_part), so of
    /// two concurrent submissions for the same stage only one is applied.
    /// Returns `None`, with nothing written, when the session was not in
    /// progress at `advance.stage`.
    pub async fn advance_stage(
        &self,
        session: &SessionModel,
        advance: StageAdvance<'_>,
    ) -> Result<Option<SessionModel>> {
        let now = Utc::now();
        let (main, secondary) = match advance.preferences {
            Some((main, secondary)) => (Some(main), Some(secondary)),
            None => (None, None),
        };
        let (end_time, duration) = if advance.complete {
            (Some(now), Some(duration_ms(session.start_time, now)))
        } else {
            (None, None)
        };

        let mut tx = self.pool.begin().await?;

        let advanced = sqlx::query_as::<_, SessionModel>(&format!(
            r#"
            UPDATE quiz_sessions SET
                current_part = current_part + 1,
                main_fragrance = COALESCE(?, main_fragrance),
                secondary_fragrance = COALESCE(?, secondary_fragrance),
                status = CASE WHEN ? THEN 'completed' ELSE status END,
                end_time = COALESCE(?, end_time),
                duration_ms = COALESCE(?, duration_ms)
            WHERE id = ? AND status = 'in_progress' AND current_part = ?
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(main)
        .bind(secondary)
        .bind(advance.complete)
        .bind(end_time)
        .bind(duration)
        .bind(session.id)
        .bind(advance.stage)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(advanced) = advanced else {
            tx.rollback().await?;
            return Ok(None);
        };

        for answer in advance.answers {
            upsert_answer_tx(&mut *tx, session.id, answer, advance.stage, now).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "session {} advanced from stage {} to {} with {} answer(s)",
            advanced.session_id,
            advance.stage,
            advanced.current_part,
            advance.answers.len()
        );
        Ok(Some(advanced))
    }
}
