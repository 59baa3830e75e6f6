use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::app::credentials::{hash_password, verify_password, CredentialVerifier, IssuedToken};
use crate::app::error::{unique_violation, ServiceError, ServiceResult};
use crate::domain::user::{User, UserActivity};
use crate::infra::db::Db;

const USER_COLUMNS: &str =
    "id, username, full_name, email, is_admin, created_at, last_login, last_request";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Stores a new user. Username and email uniqueness is decided by the
    /// `users_username_key` / `users_email_key` constraints, so two racing
    /// registrations cannot both succeed.
    pub async fn register(&self, new_user: NewUser) -> ServiceResult<User> {
        let password_hash = hash_password(&new_user.password)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (username, full_name, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.full_name)
        .bind(&new_user.email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await
        .map_err(|err| match unique_violation(&err).as_deref() {
            Some("users_username_key") => {
                ServiceError::Conflict("user with this username already exists".into())
            }
            Some("users_email_key") => {
                ServiceError::Conflict("user with this email already exists".into())
            }
            _ => err.into(),
        })?;

        Ok(user_from_row(&row))
    }

    /// Checks a username/password pair. An unknown user and a wrong password
    /// produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Err(ServiceError::InvalidCredentials);
        };

        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(user_from_row(&row))
    }

    /// Authenticates, stamps the login and activity timestamps, and issues a
    /// session token for the user.
    pub async fn login(
        &self,
        verifier: &CredentialVerifier,
        username: &str,
        password: &str,
    ) -> ServiceResult<IssuedToken> {
        let user = self.authenticate(username, password).await?;

        let mut tx = self.db.pool().begin().await?;
        record_login_with_tx(user.id, &mut tx).await?;
        record_activity_with_tx(user.id, &mut tx).await?;
        tx.commit().await?;

        let token = verifier.issue_token(&user.username)?;
        Ok(token)
    }

    pub async fn get_user(&self, user_id: i64) -> ServiceResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn get_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn activity(&self, user_id: i64) -> ServiceResult<Option<UserActivity>> {
        let row = sqlx::query("SELECT last_login, last_request FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| UserActivity {
            last_login: row.get("last_login"),
            last_request: row.get("last_request"),
        }))
    }

    pub async fn record_login(&self, user_id: i64) -> ServiceResult<OffsetDateTime> {
        let mut tx = self.db.pool().begin().await?;
        let stamped = record_login_with_tx(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(stamped)
    }

    pub async fn record_activity(&self, user_id: i64) -> ServiceResult<OffsetDateTime> {
        let mut tx = self.db.pool().begin().await?;
        let stamped = record_activity_with_tx(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(stamped)
    }
}

/// Sets `last_login` to now. The new value is always later than the previous
/// one, even when the clock has not visibly advanced.
pub(crate) async fn record_login_with_tx(
    user_id: i64,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> ServiceResult<OffsetDateTime> {
    let stamped: Option<OffsetDateTime> = sqlx::query_scalar(
        "UPDATE users \
         SET last_login = GREATEST(clock_timestamp(), last_login + interval '1 microsecond') \
         WHERE id = $1 \
         RETURNING last_login",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    stamped.ok_or_else(|| ServiceError::NotFound("user not found".into()))
}

/// Same as [`record_login_with_tx`] for `last_request`.
pub(crate) async fn record_activity_with_tx(
    user_id: i64,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> ServiceResult<OffsetDateTime> {
    let stamped: Option<OffsetDateTime> = sqlx::query_scalar(
        "UPDATE users \
         SET last_request = GREATEST(clock_timestamp(), last_request + interval '1 microsecond') \
         WHERE id = $1 \
         RETURNING last_request",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    stamped.ok_or_else(|| ServiceError::NotFound("user not found".into()))
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
        last_login: row.get("last_login"),
        last_request: row.get("last_request"),
    }
}

