use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/create_user/", post(handlers::create_user))
        .route("/users/login/", post(handlers::login))
        .route("/users/users/me/", get(handlers::get_current_user))
        .route("/users/user/activity/", get(handlers::get_user_activity))
}

pub fn posts() -> Router<AppState> {
    Router::new().route("/posts/create_post/", post(handlers::create_post))
}

pub fn likes() -> Router<AppState> {
    Router::new()
        .route("/likes/like_post/:post_id", post(handlers::like_post))
        .route(
            "/likes/delete_like_for_post/:post_id",
            post(handlers::delete_like),
        )
        .route("/likes/analytics/", get(handlers::likes_analytics))
}
