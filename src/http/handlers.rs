use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::app::likes::LikeService;
use crate::app::posts::{NewPost, PostService};
use crate::app::users::{NewUser, UserService};
use crate::domain::like::{DailyLikes, Like, LikesAnalytics};
use crate::domain::post::Post;
use crate::domain::user::{User, UserActivity};
use crate::http::extract::{ApiForm, ApiJson, ApiPath, ApiQuery};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.db.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "database ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if payload.full_name.trim().is_empty() {
        return Err(AppError::bad_request("full_name cannot be empty"));
    }
    if !payload.email.contains('@') {
        return Err(AppError::bad_request("email must be a valid address"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password cannot be empty"));
    }
    check_password_length(&payload.password)?;

    let service = UserService::new(state.db.clone());
    let user = service
        .register(NewUser {
            username: payload.username.trim().to_string(),
            full_name: payload.full_name.trim().to_string(),
            email: payload.email.trim().to_string(),
            password: payload.password,
        })
        .await
        .map_err(|err| AppError::from_service(err, "failed to create user"))?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    ApiForm(payload): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    check_password_length(&payload.password)?;

    let service = UserService::new(state.db.clone());
    let issued = service
        .login(&state.credentials(), payload.username.trim(), &payload.password)
        .await
        .map_err(|err| AppError::from_service(err, "failed to login"))?;

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer",
        expires_at: issued.expires_at,
    }))
}

pub async fn get_current_user(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub user_id: Option<i64>,
}

pub async fn get_user_activity(
    _auth: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<UserActivity>, AppError> {
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::bad_request("user_id is required"))?;

    let service = UserService::new(state.db.clone());
    let activity = service
        .activity(user_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch user activity"))?;

    match activity {
        Some(activity) => Ok(Json(activity)),
        None => Err(AppError::not_found("user not found")),
    }
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(
            auth.id(),
            NewPost {
                title: payload.title,
                content: payload.content,
                created_at: payload.created_at,
            },
        )
        .await
        .map_err(|err| AppError::from_service(err, "failed to create post"))?;

    Ok(Json(post))
}

pub async fn like_post(
    auth: AuthUser,
    ApiPath(post_id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<Like>, AppError> {
    let service = LikeService::new(state.db.clone());
    let like = service.add_like(auth.id(), post_id).await.map_err(|err| {
        tracing::debug!(user_id = auth.id(), post_id, error = %err, "like rejected");
        AppError::from_service(err, "failed to like post")
    })?;

    Ok(Json(like))
}

#[derive(Serialize)]
pub struct DeleteLikeResponse {
    pub deleted: bool,
}

pub async fn delete_like(
    auth: AuthUser,
    ApiPath(post_id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<DeleteLikeResponse>, AppError> {
    let service = LikeService::new(state.db.clone());
    let deleted = service.remove_like(auth.id(), post_id).await.map_err(|err| {
        tracing::debug!(user_id = auth.id(), post_id, error = %err, "unlike rejected");
        AppError::from_service(err, "failed to unlike post")
    })?;

    Ok(Json(DeleteLikeResponse { deleted }))
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub days: Vec<DayAnalytics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Serialize)]
pub struct DayAnalytics {
    pub date: String,
    pub likes_count: usize,
    pub users_count: usize,
    pub likes: Vec<Like>,
}

impl From<DailyLikes> for DayAnalytics {
    fn from(day: DailyLikes) -> Self {
        Self {
            date: day.date.to_string(),
            likes_count: day.likes_count,
            users_count: day.users_count,
            likes: day.likes,
        }
    }
}

impl From<Option<LikesAnalytics>> for AnalyticsResponse {
    fn from(analytics: Option<LikesAnalytics>) -> Self {
        match analytics {
            Some(analytics) => Self {
                days: analytics.days.into_iter().map(DayAnalytics::from).collect(),
                message: None,
            },
            None => Self {
                days: Vec::new(),
                message: Some("there are currently no likes"),
            },
        }
    }
}

pub async fn likes_analytics(
    _auth: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let date_from = query
        .date_from
        .ok_or_else(|| AppError::invalid_input("date_from is required"))?;
    let date_to = query
        .date_to
        .ok_or_else(|| AppError::invalid_input("date_to is required"))?;

    let service = LikeService::new(state.db.clone());
    let analytics = service
        .analytics(&date_from, &date_to)
        .await
        .map_err(|err| AppError::from_service(err, "failed to compute likes analytics"))?;

    Ok(Json(analytics.into()))
}
