use anyhow::{Result, anyhow};
use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Post, PostKind, ProcessingStatus};
use crate::infrastructure::db::pool::DbPool;

/// Status transitions the worker performs on the shared job table.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Oldest PENDING post of the given kind, if any.
    async fn next_pending(&self, kind: PostKind) -> Result<Option<Post>>;

    /// PENDING -> PROCESSING. Returns `false` when another worker got there first.
    async fn claim(&self, id: Uuid) -> Result<bool>;

    /// PROCESSING -> COMPLETED, pointing `media_url` at the published manifest.
    async fn complete(&self, id: Uuid, media_url: &str) -> Result<()>;

    /// PROCESSING -> FAILED. `media_url` is left untouched.
    async fn fail(&self, id: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Single conditional write: the row only moves if it is still in `from`,
    /// so two workers can never both win the same transition.
    async fn transition(
        &self,
        id: Uuid,
        from: ProcessingStatus,
        to: ProcessingStatus,
        media_url: Option<&str>,
    ) -> Result<bool> {
        if !from.can_transition_to(to) {
            return Err(anyhow!("Illegal status transition {} -> {}", from, to));
        }

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET processing_status = $1, media_url = COALESCE($2, media_url)
            WHERE id = $3 AND processing_status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(media_url)
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl JobStore for PostRepository {
    async fn next_pending(&self, kind: PostKind) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, type, media_url, processing_status, created_at
            FROM posts
            WHERE type = $1 AND processing_status = $2
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(kind.as_str())
        .bind(ProcessingStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn claim(&self, id: Uuid) -> Result<bool> {
        self.transition(id, ProcessingStatus::Pending, ProcessingStatus::Processing, None)
            .await
    }

    async fn complete(&self, id: Uuid, media_url: &str) -> Result<()> {
        let updated = self
            .transition(
                id,
                ProcessingStatus::Processing,
                ProcessingStatus::Completed,
                Some(media_url),
            )
            .await?;

        if !updated {
            return Err(anyhow!("Post {} is no longer PROCESSING", id));
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid) -> Result<()> {
        let updated = self
            .transition(id, ProcessingStatus::Processing, ProcessingStatus::Failed, None)
            .await?;

        if !updated {
            return Err(anyhow!("Post {} is no longer PROCESSING", id));
        }
        Ok(())
    }
}
