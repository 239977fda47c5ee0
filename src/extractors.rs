use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{db::models::AuthUser, error::QuizError, names, rejections::AppError, AppState};

/// Guard extractor that resolves the caller from the user session cookie,
/// or from an `Authorization: Bearer` token when no valid cookie is sent.
pub struct AuthGuard(pub AuthUser);

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let cookie_token = jar
            .get(names::USER_SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string());

        for token in cookie_token.into_iter().chain(bearer_token(parts)) {
            if let Some(user) = state
                .db
                .get_user_by_session(&token)
                .await
                .map_err(QuizError::from)?
            {
                return Ok(AuthGuard(user));
            }
        }

        Err(AppError::Unauthorized)
    }
}
