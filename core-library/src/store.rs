//! # Local Store
//!
//! Single entry point over the local mirror tables. Holds one repository per
//! entity and applies a pass's staged mutations atomically via [`ChangeSet`].

use crate::error::Result;
use crate::models::{LocalMix, LocalMixTag, LocalSavedView, LocalTag};
use crate::repositories::{
    mix, mix_tag, saved_view, tag, SqliteLocalMixRepository, SqliteLocalMixTagRepository,
    SqliteLocalSavedViewRepository, SqliteLocalTagRepository,
};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

/// Mutations staged during a sync pass and written in one transaction.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub mix_deletions: Vec<String>,
    pub mix_upserts: Vec<LocalMix>,
    pub tag_deletions: Vec<String>,
    pub tag_upserts: Vec<LocalTag>,
    /// Full replacement of the association set; `None` leaves it untouched.
    pub mix_tags: Option<Vec<LocalMixTag>>,
    pub saved_view_deletions: Vec<String>,
    pub saved_view_upserts: Vec<LocalSavedView>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mix_deletions.is_empty()
            && self.mix_upserts.is_empty()
            && self.tag_deletions.is_empty()
            && self.tag_upserts.is_empty()
            && self.mix_tags.is_none()
            && self.saved_view_deletions.is_empty()
            && self.saved_view_upserts.is_empty()
    }
}

/// Row counts applied by [`LocalStore::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub mixes_deleted: usize,
    pub mixes_upserted: usize,
    pub tags_deleted: usize,
    pub tags_upserted: usize,
    pub mix_tags_written: Option<usize>,
    pub saved_views_deleted: usize,
    pub saved_views_upserted: usize,
}

/// Handle to the on-device store shared by the engine and UI read paths.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    mixes: SqliteLocalMixRepository,
    tags: SqliteLocalTagRepository,
    mix_tags: SqliteLocalMixTagRepository,
    saved_views: SqliteLocalSavedViewRepository,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            mixes: SqliteLocalMixRepository::new(pool.clone()),
            tags: SqliteLocalTagRepository::new(pool.clone()),
            mix_tags: SqliteLocalMixTagRepository::new(pool.clone()),
            saved_views: SqliteLocalSavedViewRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn mixes(&self) -> &SqliteLocalMixRepository {
        &self.mixes
    }

    pub fn tags(&self) -> &SqliteLocalTagRepository {
        &self.tags
    }

    pub fn mix_tags(&self) -> &SqliteLocalMixTagRepository {
        &self.mix_tags
    }

    pub fn saved_views(&self) -> &SqliteLocalSavedViewRepository {
        &self.saved_views
    }

    /// Apply every staged mutation in one transaction.
    ///
    /// Either all rows in `changes` are written or none are.
    #[instrument(skip_all, fields(
        mix_upserts = changes.mix_upserts.len(),
        tag_upserts = changes.tag_upserts.len()
    ))]
    pub async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();
        if changes.is_empty() {
            return Ok(summary);
        }

        let mut tx = self.pool.begin().await?;

        for id in &changes.mix_deletions {
            if mix::delete_on(&mut tx, id).await? {
                summary.mixes_deleted += 1;
            }
        }
        for local in &changes.mix_upserts {
            mix::upsert_on(&mut tx, local).await?;
            summary.mixes_upserted += 1;
        }

        for id in &changes.tag_deletions {
            if tag::delete_on(&mut tx, id).await? {
                summary.tags_deleted += 1;
            }
        }
        for local in &changes.tag_upserts {
            tag::upsert_on(&mut tx, local).await?;
            summary.tags_upserted += 1;
        }

        if let Some(rows) = &changes.mix_tags {
            mix_tag::replace_all_on(&mut tx, rows).await?;
            summary.mix_tags_written = Some(rows.len());
        }

        for id in &changes.saved_view_deletions {
            if saved_view::delete_on(&mut tx, id).await? {
                summary.saved_views_deleted += 1;
            }
        }
        for view in &changes.saved_view_upserts {
            saved_view::upsert_on(&mut tx, view).await?;
            summary.saved_views_upserted += 1;
        }

        tx.commit().await?;

        debug!(?summary, "Local store commit applied");
        Ok(summary)
    }
}
