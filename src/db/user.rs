use color_eyre::Result;
use ulid::Ulid;

use super::models::AuthUser;
use super::Db;

impl Db {
    /// Returns the user with this name, creating it when absent. An existing
    /// user keeps its admin flag unless `is_admin` promotes it.
    pub async fn ensure_user(&self, username: &str, is_admin: bool) -> Result<AuthUser> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            INSERT INTO users (username, is_admin) VALUES (?, ?)
            ON CONFLICT(username) DO UPDATE SET is_admin = users.is_admin OR excluded.is_admin
            RETURNING id, username, is_admin
            "#,
        )
        .bind(username)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("user ready: id={}, username={username}", user.id);
        Ok(user)
    }

    pub async fn create_user_session(&self, user_id: i64) -> Result<String> {
        let session = Ulid::new().to_string();

        sqlx::query("INSERT INTO user_sessions (id, user_id) VALUES (?, ?)")
            .bind(&session)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("new user session created for user_id={user_id}");
        Ok(session)
    }

    pub async fn get_user_by_session(&self, session_id: &str) -> Result<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT u.id, u.username, u.is_admin
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
