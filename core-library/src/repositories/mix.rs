//! Local mix repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::LocalMix;
use async_trait::async_trait;
use sqlx::sqlite::SqliteArguments;
use sqlx::{query, query_as, query_scalar, Sqlite, SqliteConnection, SqlitePool};
use std::sync::OnceLock;

/// Every column except `id`, in bind order.
const COLUMNS: &[&str] = &[
    "type",
    "created_at",
    "title",
    "text_content",
    "photo_url",
    "photo_thumbnail_url",
    "video_url",
    "video_thumbnail_url",
    "import_url",
    "import_media_url",
    "import_thumbnail_url",
    "import_audio_url",
    "embed_url",
    "embed_og",
    "audio_url",
    "tts_audio_url",
    "preview_crop_x",
    "preview_crop_y",
    "preview_crop_scale",
    "gradient_top",
    "gradient_bottom",
    "tts_audio_path",
    "photo_path",
    "photo_thumbnail_path",
    "video_path",
    "video_thumbnail_path",
    "import_media_path",
    "import_thumbnail_path",
    "import_audio_path",
    "embed_image_path",
    "audio_path",
    "is_synced",
    "last_synced_at",
];

fn insert_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        format!(
            "INSERT INTO local_mixes (id, {}) VALUES (?, {})",
            COLUMNS.join(", "),
            vec!["?"; COLUMNS.len()].join(", ")
        )
    })
}

fn upsert_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let assignments: Vec<String> = COLUMNS
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        format!(
            "{} ON CONFLICT(id) DO UPDATE SET {}",
            insert_sql(),
            assignments.join(", ")
        )
    })
}

fn update_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let assignments: Vec<String> = COLUMNS.iter().map(|c| format!("{c} = ?")).collect();
        format!(
            "UPDATE local_mixes SET {} WHERE id = ?",
            assignments.join(", ")
        )
    })
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind every non-id column of `mix` in [`COLUMNS`] order.
fn bind_columns<'q>(q: SqliteQuery<'q>, mix: &'q LocalMix) -> Result<SqliteQuery<'q>> {
    let remote = &mix.remote;
    let paths = &mix.paths;
    let embed_og = remote
        .embed_og
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    Ok(q.bind(remote.mix_type.as_str())
        .bind(remote.created_at.timestamp_millis())
        .bind(&remote.title)
        .bind(&remote.text_content)
        .bind(&remote.photo_url)
        .bind(&remote.photo_thumbnail_url)
        .bind(&remote.video_url)
        .bind(&remote.video_thumbnail_url)
        .bind(&remote.import_url)
        .bind(&remote.import_media_url)
        .bind(&remote.import_thumbnail_url)
        .bind(&remote.import_audio_url)
        .bind(&remote.embed_url)
        .bind(embed_og)
        .bind(&remote.audio_url)
        .bind(&remote.tts_audio_url)
        .bind(remote.preview_crop_x)
        .bind(remote.preview_crop_y)
        .bind(remote.preview_crop_scale)
        .bind(&remote.gradient_top)
        .bind(&remote.gradient_bottom)
        .bind(&paths.tts_audio)
        .bind(&paths.photo)
        .bind(&paths.photo_thumbnail)
        .bind(&paths.video)
        .bind(&paths.video_thumbnail)
        .bind(&paths.import_media)
        .bind(&paths.import_thumbnail)
        .bind(&paths.import_audio)
        .bind(&paths.embed_image)
        .bind(&paths.audio)
        .bind(mix.is_synced)
        .bind(mix.last_synced_at))
}

fn validate(mix: &LocalMix) -> Result<()> {
    mix.validate().map_err(|e| LibraryError::InvalidInput {
        field: "LocalMix".to_string(),
        message: e,
    })
}

/// Insert or replace a mix on an open connection or transaction.
pub(crate) async fn upsert_on(conn: &mut SqliteConnection, mix: &LocalMix) -> Result<()> {
    validate(mix)?;
    let q = query(upsert_sql()).bind(mix.id());
    bind_columns(q, mix)?.execute(&mut *conn).await?;
    Ok(())
}

/// Delete a mix and its tag associations on an open connection or transaction.
pub(crate) async fn delete_on(conn: &mut SqliteConnection, id: &str) -> Result<bool> {
    query("DELETE FROM local_mix_tags WHERE mix_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let result = query("DELETE FROM local_mixes WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Local mix repository interface
#[async_trait]
pub trait LocalMixRepository: Send + Sync {
    /// Find a cached mix by its remote id
    async fn find_by_id(&self, id: &str) -> Result<Option<LocalMix>>;

    /// All cached mixes, newest first
    async fn find_all(&self) -> Result<Vec<LocalMix>>;

    /// Insert a new cached mix
    ///
    /// # Errors
    /// Fails if a mix with the same id already exists.
    async fn insert(&self, mix: &LocalMix) -> Result<()>;

    /// Update an existing cached mix
    ///
    /// # Errors
    /// Returns `NotFound` if the mix does not exist.
    async fn update(&self, mix: &LocalMix) -> Result<()>;

    /// Insert or replace a cached mix
    async fn upsert(&self, mix: &LocalMix) -> Result<()>;

    /// Delete a cached mix and its tag associations
    ///
    /// # Returns
    /// - `Ok(true)` if the mix was deleted
    /// - `Ok(false)` if it was not cached
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Mixes with at least one applicable media field still missing
    async fn find_unsynced(&self) -> Result<Vec<LocalMix>>;

    /// User-initiated title edit outside a sync pass
    async fn set_title(&self, id: &str, title: Option<&str>) -> Result<bool>;
}

/// SQLite implementation of LocalMixRepository
#[derive(Clone)]
pub struct SqliteLocalMixRepository {
    pool: SqlitePool,
}

impl SqliteLocalMixRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalMixRepository for SqliteLocalMixRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<LocalMix>> {
        let mix = query_as::<_, LocalMix>("SELECT * FROM local_mixes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(mix)
    }

    async fn find_all(&self) -> Result<Vec<LocalMix>> {
        let mixes =
            query_as::<_, LocalMix>("SELECT * FROM local_mixes ORDER BY created_at DESC, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(mixes)
    }

    async fn insert(&self, mix: &LocalMix) -> Result<()> {
        validate(mix)?;
        let q = query(insert_sql()).bind(mix.id());
        bind_columns(q, mix)?.execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, mix: &LocalMix) -> Result<()> {
        validate(mix)?;
        let q = bind_columns(query(update_sql()), mix)?.bind(mix.id());
        let result = q.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "LocalMix".to_string(),
                id: mix.id().to_string(),
            });
        }

        Ok(())
    }

    async fn upsert(&self, mix: &LocalMix) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_on(&mut conn, mix).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = delete_on(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM local_mixes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_unsynced(&self) -> Result<Vec<LocalMix>> {
        let mixes = query_as::<_, LocalMix>(
            "SELECT * FROM local_mixes WHERE is_synced = 0 ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(mixes)
    }

    async fn set_title(&self, id: &str, title: Option<&str>) -> Result<bool> {
        let result = query("UPDATE local_mixes SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
