use serde::Serialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Serialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub is_liked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Likes that fell on one UTC calendar day.
#[derive(Debug, Clone)]
pub struct DailyLikes {
    pub date: Date,
    pub likes_count: usize,
    /// Number of distinct users behind `likes`.
    pub users_count: usize,
    pub likes: Vec<Like>,
}

/// Non-empty analytics result, ordered by ascending date.
#[derive(Debug, Clone)]
pub struct LikesAnalytics {
    pub days: Vec<DailyLikes>,
}
