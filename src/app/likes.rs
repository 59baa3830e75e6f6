use std::collections::{BTreeMap, HashSet};

use sqlx::postgres::PgRow;
use sqlx::Row;
use time::macros::format_description;
use time::{Date, UtcOffset};

use crate::app::error::{foreign_key_violation, ServiceError, ServiceResult};
use crate::app::users::record_activity_with_tx;
use crate::domain::like::{DailyLikes, Like, LikesAnalytics};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct LikeService {
    db: Db,
}

impl LikeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Records that `user_id` likes `post_id`. The `likes_user_id_post_id_key`
    /// constraint decides duplicates, so of two concurrent identical requests
    /// exactly one succeeds.
    pub async fn add_like(&self, user_id: i64, post_id: i64) -> ServiceResult<Like> {
        let mut tx = self.db.pool().begin().await?;

        let (user_exists, post_exists): (bool, bool) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1), \
                    EXISTS (SELECT 1 FROM posts WHERE id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        if !(user_exists && post_exists) {
            tx.rollback().await?;
            return Err(no_such_post());
        }

        let row = sqlx::query(
            "INSERT INTO likes (user_id, post_id, is_liked) VALUES ($1, $2, TRUE) \
             ON CONFLICT ON CONSTRAINT likes_user_id_post_id_key DO NOTHING \
             RETURNING id, user_id, post_id, is_liked, created_at",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| match foreign_key_violation(&err) {
            Some(_) => no_such_post(),
            None => err.into(),
        })?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(ServiceError::Conflict(
                "you have already liked this post".into(),
            ));
        };

        record_activity_with_tx(user_id, &mut tx).await?;
        tx.commit().await?;

        Ok(like_from_row(&row))
    }

    /// Deletes the like row for the pair. Likes are never soft-toggled.
    pub async fn remove_like(&self, user_id: i64, post_id: i64) -> ServiceResult<bool> {
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("you did not like this post".into()));
        }

        record_activity_with_tx(user_id, &mut tx).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Per-day like counts for the inclusive range `[date_from, date_to]`.
    /// Returns `None` when no like falls in the range.
    pub async fn analytics(
        &self,
        date_from: &str,
        date_to: &str,
    ) -> ServiceResult<Option<LikesAnalytics>> {
        let from = parse_day("date_from", date_from)?;
        let to = parse_day("date_to", date_to)?;

        let likes = self.likes_between(from, to).await?;
        Ok(summarize_by_day(likes))
    }

    async fn likes_between(&self, from: Date, to: Date) -> ServiceResult<Vec<Like>> {
        let rows = sqlx::query(
            "SELECT id, user_id, post_id, is_liked, created_at \
             FROM likes \
             WHERE (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2 \
             ORDER BY created_at, id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(like_from_row).collect())
    }
}

pub fn parse_day(field: &str, value: &str) -> ServiceResult<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ServiceError::InvalidInput(format!("{} must be a date in the format YYYY-MM-DD", field))
    })
}

/// Groups likes by the UTC calendar day of their timestamp.
pub fn summarize_by_day(likes: Vec<Like>) -> Option<LikesAnalytics> {
    if likes.is_empty() {
        return None;
    }

    let mut by_day: BTreeMap<Date, Vec<Like>> = BTreeMap::new();
    for like in likes {
        let day = like.created_at.to_offset(UtcOffset::UTC).date();
        by_day.entry(day).or_default().push(like);
    }

    let days = by_day
        .into_iter()
        .map(|(date, likes)| {
            let users_count = likes
                .iter()
                .map(|like| like.user_id)
                .collect::<HashSet<_>>()
                .len();
            DailyLikes {
                date,
                likes_count: likes.len(),
                users_count,
                likes,
            }
        })
        .collect();

    Some(LikesAnalytics { days })
}

fn no_such_post() -> ServiceError {
    ServiceError::InvalidReference("there is no such post".into())
}

fn like_from_row(row: &PgRow) -> Like {
    Like {
        id: row.get("id"),
        user_id: row.get("user_id"),
        post_id: row.get("post_id"),
        is_liked: row.get("is_liked"),
        created_at: row.get("created_at"),
    }
}
