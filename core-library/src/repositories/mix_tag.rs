//! Local mix/tag association repository

use crate::error::Result;
use crate::models::LocalMixTag;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};

/// Replace every association with `rows` on an open transaction.
pub(crate) async fn replace_all_on(
    conn: &mut SqliteConnection,
    rows: &[LocalMixTag],
) -> Result<()> {
    query("DELETE FROM local_mix_tags")
        .execute(&mut *conn)
        .await?;

    for row in rows {
        query("INSERT OR IGNORE INTO local_mix_tags (mix_id, tag_id) VALUES (?, ?)")
            .bind(&row.mix_id)
            .bind(&row.tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[async_trait]
pub trait LocalMixTagRepository: Send + Sync {
    /// All associations ordered by mix then tag
    async fn find_all(&self) -> Result<Vec<LocalMixTag>>;

    async fn tag_ids_for_mix(&self, mix_id: &str) -> Result<Vec<String>>;

    async fn mix_ids_for_tag(&self, tag_id: &str) -> Result<Vec<String>>;

    /// Add an association. Adding an existing pair is a no-op.
    async fn add(&self, mix_id: &str, tag_id: &str) -> Result<()>;

    async fn remove(&self, mix_id: &str, tag_id: &str) -> Result<bool>;

    /// Atomically replace the whole association set
    async fn replace_all(&self, rows: &[LocalMixTag]) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct SqliteLocalMixTagRepository {
    pool: SqlitePool,
}

impl SqliteLocalMixTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalMixTagRepository for SqliteLocalMixTagRepository {
    async fn find_all(&self) -> Result<Vec<LocalMixTag>> {
        let rows = query_as::<_, LocalMixTag>(
            "SELECT mix_id, tag_id FROM local_mix_tags ORDER BY mix_id, tag_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn tag_ids_for_mix(&self, mix_id: &str) -> Result<Vec<String>> {
        let ids = query_scalar::<_, String>(
            "SELECT tag_id FROM local_mix_tags WHERE mix_id = ? ORDER BY tag_id",
        )
        .bind(mix_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn mix_ids_for_tag(&self, tag_id: &str) -> Result<Vec<String>> {
        let ids = query_scalar::<_, String>(
            "SELECT mix_id FROM local_mix_tags WHERE tag_id = ? ORDER BY mix_id",
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn add(&self, mix_id: &str, tag_id: &str) -> Result<()> {
        query("INSERT OR IGNORE INTO local_mix_tags (mix_id, tag_id) VALUES (?, ?)")
            .bind(mix_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, mix_id: &str, tag_id: &str) -> Result<bool> {
        let result = query("DELETE FROM local_mix_tags WHERE mix_id = ? AND tag_id = ?")
            .bind(mix_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_all(&self, rows: &[LocalMixTag]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        replace_all_on(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM local_mix_tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn row(mix_id: &str, tag_id: &str) -> LocalMixTag {
        LocalMixTag {
            mix_id: mix_id.to_string(),
            tag_id: tag_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let repo = SqliteLocalMixTagRepository::new(create_test_pool().await.unwrap());
        repo.add("m1", "t1").await.unwrap();
        repo.add("m1", "t1").await.unwrap();
        repo.add("m1", "t2").await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.tag_ids_for_mix("m1").await.unwrap(), vec!["t1", "t2"]);
        assert_eq!(repo.mix_ids_for_tag("t2").await.unwrap(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = SqliteLocalMixTagRepository::new(create_test_pool().await.unwrap());
        repo.add("m1", "t1").await.unwrap();

        assert!(repo.remove("m1", "t1").await.unwrap());
        assert!(!repo.remove("m1", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_all_matches_input_exactly() {
        let repo = SqliteLocalMixTagRepository::new(create_test_pool().await.unwrap());
        repo.add("stale", "t9").await.unwrap();

        let rows = vec![row("m2", "t1"), row("m1", "t1"), row("m1", "t1")];
        repo.replace_all(&rows).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap(), vec![row("m1", "t1"), row("m2", "t1")]);

        repo.replace_all(&[]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
