//! Post Tests
//!
//! Covers post creation through the API and the service layer.

mod common;

use axum::http::StatusCode;
use common::app;
use murmur::app::error::ServiceError;
use murmur::app::posts::{NewPost, PostService};
use murmur::app::users::UserService;
use serde_json::json;
use time::macros::datetime;

#[tokio::test]
async fn create_post_valid() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/posts/create_post/",
            json!({ "title": "First", "content": "Hello there" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["id"].is_i64());
    assert_eq!(body["author"], user.username.as_str());
    assert_eq!(body["title"], "First");
    assert_eq!(body["content"], "Hello there");
    assert!(body["created_at"].is_string());
    assert!(body.get("owner_id").is_none());

    let stored = PostService::new(app.state.db.clone())
        .get_post(body["id"].as_i64().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.owner_id, user.id);
}

#[tokio::test]
async fn create_post_honors_explicit_timestamp() {
    let app = app().await;
    let user = app.create_user("post_backdated").await;

    let resp = app
        .post_json(
            "/posts/create_post/",
            json!({
                "title": "Backdated",
                "content": "From the past",
                "created_at": "2001-02-03T04:05:06Z"
            }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["created_at"], "2001-02-03T04:05:06Z");
}

#[tokio::test]
async fn create_post_rejects_empty_fields() {
    let app = app().await;
    let user = app.create_user("post_empty").await;

    let cases = [
        (json!({ "title": "", "content": "body" }), "title cannot be empty"),
        (json!({ "title": "title", "content": "   " }), "content cannot be empty"),
    ];

    for (body, message) in cases {
        let resp = app
            .post_json("/posts/create_post/", body, Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(resp.error_code(), "invalid_input");
        assert_eq!(resp.error_message(), message);
    }
}

#[tokio::test]
async fn create_post_records_activity() {
    let app = app().await;
    let user = app.create_user("post_activity").await;
    let users = UserService::new(app.state.db.clone());

    let before = users.activity(user.id).await.unwrap().unwrap();
    assert!(before.last_request.is_none());

    app.create_post(user.id).await;

    let after = users.activity(user.id).await.unwrap().unwrap();
    assert!(after.last_request.is_some());
    assert!(after.last_login.is_none());
}

#[tokio::test]
async fn create_post_for_unknown_owner() {
    let app = app().await;

    let err = PostService::new(app.state.db.clone())
        .create_post(
            -1,
            NewPost {
                title: "orphan".into(),
                content: "nobody owns this".into(),
                created_at: Some(datetime!(2001-01-01 0:00 UTC)),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn get_missing_post() {
    let app = app().await;

    let post = PostService::new(app.state.db.clone()).get_post(-1).await.unwrap();
    assert!(post.is_none());
}
