//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, filesystem) and the hosted
//! backend endpoint into the mix core: local SQLite store, media file store,
//! REST clients and the sync engine. Desktop apps typically enable the
//! `desktop-shims` feature so `CoreConfig` falls back to the reqwest and
//! tokio adapters from `bridge-desktop`.
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, RemoteEndpoint};
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/mix.db")
//!     .media_dir("/data/media")
//!     .remote(RemoteEndpoint::new("https://project.example.co", "anon-key", "media"))
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config).await?;
//! let status = core.sync().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::collections::HashSet;
use std::sync::Arc;

use core_cache::{FileStoreConfig, MediaFileStore};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::LocalMixRepository;
use core_library::LocalStore;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::logging::strip_path;
use core_sync::{SyncConfig, SyncEngine, SyncStatus};
use provider_remote::{RestBlobStore, RestClient, RestRowStore};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct CoreService {
    store: LocalStore,
    file_store: Arc<MediaFileStore>,
    rows: Arc<RestRowStore>,
    blobs: Arc<RestBlobStore>,
    engine: SyncEngine,
    event_bus: EventBus,
}

impl CoreService {
    /// Bootstrap with default file-store and sync settings.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        Self::bootstrap_with(config, FileStoreConfig::default(), SyncConfig::default()).await
    }

    /// Bootstrap the core: open the local store, build the remote clients,
    /// prepare the media directory and assemble the sync engine.
    ///
    /// The storage bucket and base URL of `file_store_config` are taken from
    /// the remote endpoint.
    #[instrument(skip_all)]
    pub async fn bootstrap_with(
        config: CoreConfig,
        file_store_config: FileStoreConfig,
        sync_config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let store = LocalStore::new(pool);

        let client = RestClient::from_endpoint(config.http_client.clone(), &config.remote);
        let rows = Arc::new(RestRowStore::new(client.clone()));
        let blobs = Arc::new(RestBlobStore::new(
            client,
            config.remote.storage_bucket.clone(),
        ));

        let file_store_config = file_store_config
            .with_storage_bucket(config.remote.storage_bucket.clone())
            .with_storage_base_url(config.remote.base_url.clone());
        let file_store = Arc::new(MediaFileStore::new(
            file_store_config,
            config.media_dir.clone(),
            config.file_system.clone(),
            config.http_client.clone(),
            blobs.clone(),
        ));
        file_store.initialize().await?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let mut engine = SyncEngine::new(sync_config, rows.clone(), rows.clone(), file_store.clone())
            .with_event_bus(event_bus.clone());
        if engine.config().sync_saved_views {
            engine = engine.with_saved_views(rows.clone());
        }

        info!(
            database = %strip_path(&config.database_path.to_string_lossy()),
            media_dir = %strip_path(&config.media_dir.to_string_lossy()),
            "Core service ready"
        );

        Ok(Self {
            store,
            file_store,
            rows,
            blobs,
            engine,
            event_bus,
        })
    }

    /// Run one sync pass and return the status it ended in.
    pub async fn sync(&self) -> SyncStatus {
        self.engine.sync(&self.store).await;
        self.engine.status()
    }

    pub fn status(&self) -> SyncStatus {
        self.engine.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.engine.subscribe_status()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Local SQLite store read by the UI.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn file_store(&self) -> &Arc<MediaFileStore> {
        &self.file_store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Remote row store for user-initiated writes.
    pub fn remote_rows(&self) -> Arc<RestRowStore> {
        Arc::clone(&self.rows)
    }

    /// Remote blob store for media uploads.
    pub fn remote_blobs(&self) -> Arc<RestBlobStore> {
        Arc::clone(&self.blobs)
    }

    /// Delete media files no cached mix references.
    ///
    /// Refused while a pass is active. Passes started meanwhile wait until
    /// the sweep finishes, so files written by a pass are never swept before
    /// the pass records them.
    #[instrument(skip(self))]
    pub async fn remove_orphaned_media(&self) -> Result<usize> {
        let _exclusive = self.engine.try_exclusive()?;

        let known: HashSet<String> = self
            .store
            .mixes()
            .find_all()
            .await?
            .iter()
            .flat_map(|mix| mix.paths.all())
            .map(str::to_string)
            .collect();

        Ok(self.file_store.remove_orphans(&known).await?)
    }

    /// Close the database pool.
    pub async fn shutdown(&self) {
        self.store.pool().close().await;
        info!("Core service shut down");
    }
}
