//! Local tag repository

use crate::error::{LibraryError, Result};
use crate::models::LocalTag;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};

pub(crate) async fn upsert_on(conn: &mut SqliteConnection, tag: &LocalTag) -> Result<()> {
    tag.validate()
        .map_err(|e| LibraryError::InvalidInput {
            field: "LocalTag".to_string(),
            message: e,
        })?;

    query(
        r#"
        INSERT INTO local_tags (id, name, created_at) VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name, created_at = excluded.created_at
        "#,
    )
    .bind(&tag.id)
    .bind(&tag.name)
    .bind(tag.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_on(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let result = query("DELETE FROM local_tags WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
pub trait LocalTagRepository: Send + Sync {
    /// All cached tags ordered by name
    async fn find_all(&self) -> Result<Vec<LocalTag>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<LocalTag>>;

    async fn upsert(&self, tag: &LocalTag) -> Result<()>;

    /// Delete a cached tag. Associations are reconciled separately.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

#[derive(Clone)]
pub struct SqliteLocalTagRepository {
    pool: SqlitePool,
}

impl SqliteLocalTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalTagRepository for SqliteLocalTagRepository {
    async fn find_all(&self) -> Result<Vec<LocalTag>> {
        let tags = query_as::<_, LocalTag>("SELECT * FROM local_tags ORDER BY name COLLATE NOCASE, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LocalTag>> {
        let tag = query_as::<_, LocalTag>("SELECT * FROM local_tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn upsert(&self, tag: &LocalTag) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_on(&mut conn, tag).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        delete_on(&mut conn, id).await
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM local_tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn tag(id: &str, name: &str) -> LocalTag {
        LocalTag {
            id: id.to_string(),
            name: name.to_string(),
            created_at: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_upsert_renames_existing_tag() {
        let repo = SqliteLocalTagRepository::new(create_test_pool().await.unwrap());

        repo.upsert(&tag("t1", "travel")).await.unwrap();
        repo.upsert(&tag("t1", "Travel 2024")).await.unwrap();

        let found = repo.find_by_id("t1").await.unwrap().unwrap();
        assert_eq!(found.name, "Travel 2024");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_all_sorted_by_name() {
        let repo = SqliteLocalTagRepository::new(create_test_pool().await.unwrap());
        repo.upsert(&tag("t2", "music")).await.unwrap();
        repo.upsert(&tag("t1", "Art")).await.unwrap();

        let names: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Art", "music"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = SqliteLocalTagRepository::new(create_test_pool().await.unwrap());
        repo.upsert(&tag("t1", "a")).await.unwrap();

        assert!(repo.delete("t1").await.unwrap());
        assert!(!repo.delete("t1").await.unwrap());
        assert!(repo.find_by_id("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_blank_name() {
        let repo = SqliteLocalTagRepository::new(create_test_pool().await.unwrap());
        let result = repo.upsert(&tag("t1", "  ")).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}
