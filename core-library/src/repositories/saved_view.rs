//! Local saved view repository

use crate::error::{LibraryError, Result};
use crate::models::LocalSavedView;
use async_trait::async_trait;
use sqlx::{query, query_as, SqliteConnection, SqlitePool};

pub(crate) async fn upsert_on(conn: &mut SqliteConnection, view: &LocalSavedView) -> Result<()> {
    if view.id.trim().is_empty() {
        return Err(LibraryError::InvalidInput {
            field: "id".to_string(),
            message: "Saved view id cannot be empty".to_string(),
        });
    }

    let tag_ids = serde_json::to_string(&view.tag_ids)?;

    query(
        r#"
        INSERT INTO local_saved_views (id, name, tag_ids, created_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            tag_ids = excluded.tag_ids,
            created_at = excluded.created_at
        "#,
    )
    .bind(&view.id)
    .bind(&view.name)
    .bind(tag_ids)
    .bind(view.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_on(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    let result = query("DELETE FROM local_saved_views WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
pub trait LocalSavedViewRepository: Send + Sync {
    /// All cached saved views, oldest first
    async fn find_all(&self) -> Result<Vec<LocalSavedView>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<LocalSavedView>>;

    async fn upsert(&self, view: &LocalSavedView) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Atomically mirror `views` as the complete set
    async fn replace_all(&self, views: &[LocalSavedView]) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteLocalSavedViewRepository {
    pool: SqlitePool,
}

impl SqliteLocalSavedViewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalSavedViewRepository for SqliteLocalSavedViewRepository {
    async fn find_all(&self) -> Result<Vec<LocalSavedView>> {
        let views = query_as::<_, LocalSavedView>(
            "SELECT * FROM local_saved_views ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(views)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LocalSavedView>> {
        let view = query_as::<_, LocalSavedView>("SELECT * FROM local_saved_views WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(view)
    }

    async fn upsert(&self, view: &LocalSavedView) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_on(&mut conn, view).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        delete_on(&mut conn, id).await
    }

    async fn replace_all(&self, views: &[LocalSavedView]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM local_saved_views")
            .execute(&mut *tx)
            .await?;
        for view in views {
            upsert_on(&mut tx, view).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn view(id: &str, name: &str, tag_ids: &[&str], created_at: i64) -> LocalSavedView {
        LocalSavedView {
            id: id.to_string(),
            name: name.to_string(),
            tag_ids: tag_ids.iter().map(|s| s.to_string()).collect(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_upsert_round_trips_tag_ids() {
        let repo = SqliteLocalSavedViewRepository::new(create_test_pool().await.unwrap());
        let v = view("v1", "Trips", &["t1", "t2"], 10);
        repo.upsert(&v).await.unwrap();

        assert_eq!(repo.find_by_id("v1").await.unwrap(), Some(v));
    }

    #[tokio::test]
    async fn test_replace_all_drops_missing_views() {
        let repo = SqliteLocalSavedViewRepository::new(create_test_pool().await.unwrap());
        repo.upsert(&view("old", "Old", &[], 1)).await.unwrap();

        let fresh = vec![view("b", "B", &["t1"], 3), view("a", "A", &[], 2)];
        repo.replace_all(&fresh).await.unwrap();

        let ids: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!repo.delete("old").await.unwrap());
    }
}
