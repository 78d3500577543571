//! # Sync Engine
//!
//! Runs one reconciliation pass between the remote library and the local
//! cache.
//!
//! ## Workflow
//!
//! 1. Fetch the complete remote mix list
//! 2. Load the local mix cache
//! 3. Delete local mixes missing remotely, files first. Committed
//!    immediately and never gated by the storage check
//! 4. Partition remote mixes into new and existing
//! 5. Admission check: pending files × per-file estimate against headroom
//! 6. New mixes: mirror, download applicable media, derive the synced flag
//! 7. Existing mixes: refresh scalar fields, retry missing media
//! 8. Stage tag and association changes (best-effort)
//! 9. Commit every staged change in one transaction
//! 10. Mirror saved views (best-effort, own transaction)
//!
//! ## Failure semantics
//!
//! `sync` never returns an error. The outcome is published through the
//! status cell and, when attached, the event bus. Fetch, admission and
//! persist failures end in `Failed(reason)`. Per-field download failures and
//! tag failures are logged and retried on the next pass.
//!
//! ## Shared files
//!
//! Media paths depend only on the URL, so one file can back several mixes.
//! A file is deleted only once no surviving or incoming mix maps to it. Files
//! released by a refresh are deleted after the commit that drops them.
//!
//! ## Exclusivity
//!
//! Passes hold the engine's pass lock from start to finish. Maintenance that
//! must not interleave with a pass takes the same lock through
//! [`SyncEngine::try_exclusive`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = SyncEngine::new(SyncConfig::default(), mixes, tags, file_store)
//!     .with_saved_views(saved_views)
//!     .with_event_bus(event_bus);
//!
//! engine.sync(&local_store).await;
//! match engine.status() {
//!     SyncStatus::Completed => println!("up to date"),
//!     SyncStatus::Failed { reason } => println!("sync failed: {}", reason),
//!     _ => {}
//! }
//! ```

use crate::{
    admission::AdmissionPlan,
    config::SyncConfig,
    media,
    reconcile::{self, TagReconciler},
    status::{SyncStatus, SyncStatusCell},
    Result, SyncError,
};
use bridge_traits::remote::{Mix, MixRepository, SavedViewRepository, TagRepository};
use bridge_traits::time::{Clock, SystemClock};
use core_cache::MediaFileStore;
use core_library::repositories::{LocalMixRepository, LocalSavedViewRepository, LocalTagRepository};
use core_library::{ChangeSet, LocalMix, LocalStore};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent, SyncSummary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Reconciles the remote mix library with the local cache.
pub struct SyncEngine {
    config: SyncConfig,
    mixes: Arc<dyn MixRepository>,
    tags: Arc<dyn TagRepository>,
    saved_views: Option<Arc<dyn SavedViewRepository>>,
    file_store: Arc<MediaFileStore>,
    status: SyncStatusCell,
    event_bus: Option<EventBus>,
    clock: Arc<dyn Clock>,
    pass_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create a sync engine
    ///
    /// # Arguments
    ///
    /// * `config` - Sync configuration
    /// * `mixes` - Remote mix repository
    /// * `tags` - Remote tag and association repository
    /// * `file_store` - Local media file store
    pub fn new(
        config: SyncConfig,
        mixes: Arc<dyn MixRepository>,
        tags: Arc<dyn TagRepository>,
        file_store: Arc<MediaFileStore>,
    ) -> Self {
        Self {
            config,
            mixes,
            tags,
            saved_views: None,
            file_store,
            status: SyncStatusCell::new(),
            event_bus: None,
            clock: Arc::new(SystemClock),
            pass_lock: Mutex::new(()),
        }
    }

    /// Mirror saved views through `repository`.
    pub fn with_saved_views(mut self, repository: Arc<dyn SavedViewRepository>) -> Self {
        self.saved_views = Some(repository);
        self
    }

    /// Publish sync and library events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn file_store(&self) -> &Arc<MediaFileStore> {
        &self.file_store
    }

    /// Current status snapshot
    pub fn status(&self) -> SyncStatus {
        self.status.current()
    }

    /// Receiver notified on every status change
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Hold off passes while the returned guard lives.
    ///
    /// Fails with [`SyncError::AlreadyRunning`] when a pass is active. A
    /// `sync` call made while the guard is held waits for it to drop.
    pub fn try_exclusive(&self) -> Result<MutexGuard<'_, ()>> {
        let guard = self
            .pass_lock
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        if self.status.current().is_active() {
            return Err(SyncError::AlreadyRunning);
        }
        Ok(guard)
    }

    /// Run one reconciliation pass.
    ///
    /// Success or failure is reported through [`SyncEngine::status`]. A call
    /// made while another pass is active is ignored.
    #[instrument(skip_all)]
    pub async fn sync(&self, store: &LocalStore) {
        if !self.status.try_begin() {
            warn!("Sync requested while a pass is in progress; ignoring");
            return;
        }
        let _pass = self.pass_lock.lock().await;

        let pass_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(pass_id = %pass_id, "Sync pass started");
        self.emit_sync(SyncEvent::Started {
            pass_id: pass_id.clone(),
        });

        match self.run_pass(store, &pass_id).await {
            Ok(mut stats) => {
                stats.duration_ms = started.elapsed().as_millis() as u64;
                self.set_status(SyncStatus::Completed);
                info!(
                    pass_id = %pass_id,
                    added = stats.mixes_added,
                    updated = stats.mixes_updated,
                    deleted = stats.mixes_deleted,
                    downloaded = stats.files_downloaded,
                    failed = stats.files_failed,
                    duration_ms = stats.duration_ms,
                    "Sync pass completed"
                );
                self.emit_sync(SyncEvent::Completed { pass_id, stats });
            }
            Err(e) => {
                let reason = e.to_string();
                error!(pass_id = %pass_id, error = %reason, "Sync pass failed");
                self.set_status(SyncStatus::Failed {
                    reason: reason.clone(),
                });
                self.emit_sync(SyncEvent::Failed {
                    pass_id,
                    message: reason,
                    storage_rejected: e.is_storage_rejection(),
                });
            }
        }
    }

    async fn run_pass(&self, store: &LocalStore, pass_id: &str) -> Result<SyncSummary> {
        let mut stats = SyncSummary::default();
        let mut library_events = Vec::new();

        // Step 1: remote mixes
        let mut remote = self
            .mixes
            .list_mixes()
            .await
            .map_err(SyncError::fetch("mixes"))?;
        let mut seen = HashSet::new();
        remote.retain(|mix| seen.insert(mix.id.clone()));
        debug!(count = remote.len(), "Fetched remote mixes");

        // Step 2: local cache
        let local = store.mixes().find_all().await?;
        let remote_ids: HashSet<&str> = remote.iter().map(|mix| mix.id.as_str()).collect();

        // Step 3: deletions, before any space check
        let mut local_by_id: HashMap<String, LocalMix> = HashMap::new();
        let mut deleted = Vec::new();
        for cached in local {
            if remote_ids.contains(cached.id()) {
                local_by_id.insert(cached.id().to_string(), cached);
            } else {
                deleted.push(cached);
            }
        }

        if !deleted.is_empty() {
            let mut in_use = media::referenced_paths(local_by_id.values());
            for mix in &remote {
                in_use.extend(media::expected_paths(mix, &self.file_store));
            }

            let mut removed_per_mix = Vec::with_capacity(deleted.len());
            for cached in &deleted {
                let paths = cached.paths.all().into_iter().map(str::to_string);
                let files_removed = media::remove_unreferenced(paths, &in_use, &self.file_store).await;
                removed_per_mix.push(files_removed);
            }

            let deletions = ChangeSet {
                mix_deletions: deleted.iter().map(|mix| mix.id().to_string()).collect(),
                ..ChangeSet::default()
            };
            store.commit(deletions).await.map_err(SyncError::Persist)?;

            for (cached, files_removed) in deleted.iter().zip(removed_per_mix) {
                debug!(mix_id = %cached.id(), files_removed, "Removed mix deleted remotely");
                stats.mixes_deleted += 1;
                stats.files_deleted += files_removed;
                self.emit_library(LibraryEvent::MixDeleted {
                    mix_id: cached.id().to_string(),
                    files_removed: files_removed as u32,
                });
            }
        }

        // Step 4: partition, keeping remote order
        let (new_mixes, existing_mixes): (Vec<&Mix>, Vec<&Mix>) = remote
            .iter()
            .partition(|mix| !local_by_id.contains_key(&mix.id));

        // Step 5: admission
        let mut pending_files = 0;
        for mix in &new_mixes {
            pending_files += media::pending_downloads(mix, None, &self.file_store).await;
        }
        for mix in &existing_mixes {
            let cached = local_by_id.get(&mix.id);
            pending_files += media::pending_downloads(mix, cached, &self.file_store).await;
        }
        AdmissionPlan::new(pending_files, self.config.per_file_estimate_bytes)
            .check(&self.file_store)
            .await?;

        // Steps 6 and 7: materialize media
        let total = remote.len() as u64;
        let mut current = 0;
        self.set_status(SyncStatus::Downloading { current, total });

        let synced_at = self.clock.unix_timestamp_millis();
        let mut changes = ChangeSet::new();
        let mut released = Vec::new();

        for mix in new_mixes {
            let mut cached = LocalMix::from_remote(mix);
            let report = media::reconcile_media(&mut cached, &self.file_store).await;
            cached.is_synced = report.all_satisfied();
            cached.last_synced_at = Some(synced_at);

            stats.mixes_added += 1;
            stats.files_downloaded += report.downloaded;
            stats.files_failed += report.failed;
            released.extend(report.released);
            library_events.push(LibraryEvent::MixAdded {
                mix_id: mix.id.clone(),
                mix_type: mix.mix_type.as_str().to_string(),
                synced: cached.is_synced,
            });
            changes.mix_upserts.push(cached);

            current += 1;
            self.report_progress(pass_id, current, total);
        }

        for mix in existing_mixes {
            let Some(mut cached) = local_by_id.remove(&mix.id) else {
                continue;
            };
            cached.apply_remote(mix);
            let report = media::reconcile_media(&mut cached, &self.file_store).await;
            cached.is_synced = report.all_satisfied();
            cached.last_synced_at = Some(synced_at);

            stats.mixes_updated += 1;
            stats.files_downloaded += report.downloaded;
            stats.files_failed += report.failed;
            released.extend(report.released);
            library_events.push(LibraryEvent::MixUpdated {
                mix_id: mix.id.clone(),
                synced: cached.is_synced,
            });
            changes.mix_upserts.push(cached);

            current += 1;
            self.report_progress(pass_id, current, total);
        }

        // Step 8: tags, best-effort
        match self.stage_tags(store, &mut changes).await {
            Ok(event) => library_events.push(event),
            Err(e) => {
                warn!(error = %e, "Tag sync failed; mixes are still committed");
                self.emit_sync(SyncEvent::Warning {
                    pass_id: pass_id.to_string(),
                    message: format!("Tag sync skipped: {}", e),
                });
            }
        }

        // Step 9: single persist
        let in_use = media::referenced_paths(&changes.mix_upserts);
        let summary = store.commit(changes).await.map_err(SyncError::Persist)?;
        debug!(?summary, "Sync pass persisted");
        stats.files_deleted += media::remove_unreferenced(released, &in_use, &self.file_store).await;
        for event in library_events {
            self.emit_library(event);
        }

        // Step 10: saved views, best-effort
        if self.config.sync_saved_views && self.saved_views.is_some() {
            if let Err(e) = self.sync_saved_views(store).await {
                warn!(error = %e, "Saved view sync failed");
                self.emit_sync(SyncEvent::Warning {
                    pass_id: pass_id.to_string(),
                    message: format!("Saved view sync skipped: {}", e),
                });
            }
        }

        Ok(stats)
    }

    /// Fetch remote tags and associations and stage them into `changes`.
    ///
    /// Nothing is staged unless both fetches succeed.
    async fn stage_tags(&self, store: &LocalStore, changes: &mut ChangeSet) -> Result<LibraryEvent> {
        let remote_tags = self
            .tags
            .list_tags()
            .await
            .map_err(SyncError::fetch("tags"))?;
        let remote_rows = self
            .tags
            .list_mix_tags()
            .await
            .map_err(SyncError::fetch("mix tags"))?;
        let local_tags = store.tags().find_all().await?;

        let plan = TagReconciler::plan(&remote_tags, &local_tags);
        let associations = TagReconciler::associations(&remote_rows);
        debug!(
            deletions = plan.deletions.len(),
            upserts = plan.upserts.len(),
            associations = associations.len(),
            "Staged tag changes"
        );

        let tag_count = remote_tags
            .iter()
            .map(|tag| tag.id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let event = LibraryEvent::TagsReconciled {
            tags: tag_count as u32,
            relations: associations.len() as u32,
        };

        changes.tag_deletions = plan.deletions;
        changes.tag_upserts = plan.upserts;
        changes.mix_tags = Some(associations);
        Ok(event)
    }

    /// Mirror remote saved views into the local store in one transaction.
    ///
    /// Returns the number of saved views now cached. Without a saved view
    /// repository this is a no-op.
    #[instrument(skip_all)]
    pub async fn sync_saved_views(&self, store: &LocalStore) -> Result<usize> {
        let Some(repository) = &self.saved_views else {
            debug!("No saved view repository configured");
            return Ok(0);
        };

        let remote = repository
            .list_saved_views()
            .await
            .map_err(SyncError::fetch("saved views"))?;
        let local = store.saved_views().find_all().await?;
        let plan = reconcile::plan_saved_views(&remote, &local);

        if !plan.is_empty() {
            let changes = ChangeSet {
                saved_view_deletions: plan.deletions,
                saved_view_upserts: plan.upserts,
                ..ChangeSet::default()
            };
            store.commit(changes).await.map_err(SyncError::Persist)?;
        }

        let count = store.saved_views().find_all().await?.len();
        info!(count, "Saved views synced");
        self.emit_library(LibraryEvent::SavedViewsSynced {
            count: count as u32,
        });
        Ok(count)
    }

    fn report_progress(&self, pass_id: &str, current: u64, total: u64) {
        self.set_status(SyncStatus::Downloading { current, total });
        self.emit_sync(SyncEvent::Progress {
            pass_id: pass_id.to_string(),
            current,
            total,
        });
    }

    fn set_status(&self, status: SyncStatus) {
        if let Err(e) = self.status.advance(status) {
            debug!(error = %e, "Status transition skipped");
        }
    }

    fn emit_sync(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }

    fn emit_library(&self, event: LibraryEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Library(event)).ok();
        }
    }
}
