use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    #[serde(skip_serializing)]
    pub owner_id: i64,
    /// Username of the owner, resolved when the post is loaded.
    pub author: String,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
