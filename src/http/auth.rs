use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::users::UserService;
use crate::domain::user::User;
use crate::http::AppError;
use crate::AppState;

/// The user behind a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let username = state
            .credentials()
            .verify_token(token.trim())
            .map_err(|err| AppError::from_service(err, "failed to authenticate"))?;

        let service = UserService::new(state.db.clone());
        let user = service
            .get_by_username(&username)
            .await
            .map_err(|err| AppError::from_service(err, "failed to authenticate"))?;

        // A valid token for a user that no longer resolves is still rejected.
        let user = user.ok_or_else(|| AppError::unauthorized("invalid credentials"))?;
        Ok(AuthUser { user })
    }
}
