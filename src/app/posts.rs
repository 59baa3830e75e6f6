use sqlx::Row;
use time::OffsetDateTime;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::users::record_activity_with_tx;
use crate::domain::post::Post;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    /// Defaults to the insertion time when absent.
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, owner_id: i64, new_post: NewPost) -> ServiceResult<Post> {
        if new_post.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("title cannot be empty".into()));
        }
        if new_post.content.trim().is_empty() {
            return Err(ServiceError::InvalidInput("content cannot be empty".into()));
        }

        let mut tx = self.db.pool().begin().await?;

        // The insert selects from users, so a missing owner inserts nothing.
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (owner_id, title, content, created_at) \
                SELECT u.id, $2, $3, COALESCE($4, now()) \
                FROM users u WHERE u.id = $1 \
                RETURNING id, owner_id, title, content, created_at \
             ) \
             SELECT p.*, u.username AS author \
             FROM inserted_post p \
             JOIN users u ON p.owner_id = u.id",
        )
        .bind(owner_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(new_post.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("user not found".into()));
        };

        record_activity_with_tx(owner_id, &mut tx).await?;
        tx.commit().await?;

        Ok(Post {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            author: row.get("author"),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn get_post(&self, post_id: i64) -> ServiceResult<Option<Post>> {
        let row = sqlx::query(
            "SELECT p.id, p.owner_id, u.username AS author, p.title, p.content, p.created_at \
             FROM posts p \
             JOIN users u ON p.owner_id = u.id \
             WHERE p.id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Post {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            author: row.get("author"),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        }))
    }
}
