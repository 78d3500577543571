//! # Media File Store
//!
//! Materializes remote media as files under a private media root and answers
//! storage-headroom questions for the sync engine.
//!
//! - Deterministic relative paths (see [`crate::paths`])
//! - Downloads from the blob store or plain HTTP, skipped when the target
//!   file already exists
//! - Idempotent deletes
//! - Free-space query with a safety margin; query failures read as no space

use crate::config::FileStoreConfig;
use crate::error::{FileStoreError, Result};
use crate::paths;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::storage::{BlobStore, FileSystemAccess};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// On-disk store for downloaded media blobs.
pub struct MediaFileStore {
    config: FileStoreConfig,
    root: PathBuf,
    fs: Arc<dyn FileSystemAccess>,
    http_client: Arc<dyn HttpClient>,
    blob_store: Arc<dyn BlobStore>,
}

impl MediaFileStore {
    /// Create a file store rooted at `root`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let store = MediaFileStore::new(
    ///     FileStoreConfig::default(),
    ///     "/var/lib/mix/media",
    ///     file_system,
    ///     http_client,
    ///     blob_store,
    /// );
    /// store.initialize().await?;
    /// ```
    pub fn new(
        config: FileStoreConfig,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystemAccess>,
        http_client: Arc<dyn HttpClient>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            root: root.into(),
            fs,
            http_client,
            blob_store,
        }
    }

    /// Validate configuration and create the media root.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.config.validate().map_err(FileStoreError::Config)?;
        self.fs.create_dir_all(&self.root).await?;
        info!("Media file store initialized at {:?}", self.root);
        Ok(())
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative media path. Pure path composition.
    pub fn file_url(&self, relative_path: &str) -> PathBuf {
        paths::resolve(&self.root, relative_path)
    }

    /// Blob-store object path referenced by `url`, if it is one.
    pub fn storage_path_from_url(&self, url: &str) -> Option<String> {
        paths::storage_path_from_url(
            url,
            &self.config.storage_bucket,
            self.config.storage_base_url.as_deref(),
        )
    }

    /// Relative path a remote reference materializes to.
    pub fn local_path_for(&self, url: &str) -> Result<String> {
        match self.storage_path_from_url(url) {
            Some(storage_path) => paths::storage_local_path(&storage_path),
            None => Ok(paths::external_local_path(url)),
        }
    }

    /// Download `url` through the blob store when it references one,
    /// otherwise over HTTP.
    pub async fn download(&self, url: &str) -> Result<String> {
        match self.storage_path_from_url(url) {
            Some(storage_path) => self.download_from_storage(&storage_path).await,
            None => self.download_from_url(url).await,
        }
    }

    /// Fetch a blob-store object and return its relative local path.
    #[instrument(skip(self))]
    pub async fn download_from_storage(&self, storage_path: &str) -> Result<String> {
        let relative = paths::storage_local_path(storage_path)?;
        if self.file_exists(&relative).await {
            debug!(path = %relative, "Storage object already materialized");
            return Ok(relative);
        }

        let data = self
            .with_timeout(storage_path, self.blob_store.download(storage_path))
            .await??;

        self.write(&relative, data).await?;
        Ok(relative)
    }

    /// Fetch an external URL and return its relative local path.
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn download_from_url(&self, url: &str) -> Result<String> {
        let relative = paths::external_local_path(url);
        if self.file_exists(&relative).await {
            debug!(path = %relative, "External media already materialized");
            return Ok(relative);
        }

        let request = HttpRequest::get(url.trim()).timeout(self.config.download_timeout);
        let response = self
            .with_timeout(redact_url(url), self.http_client.execute(request))
            .await??;

        if !response.is_success() {
            return Err(FileStoreError::HttpStatus {
                status: response.status,
                url: redact_url(url).to_string(),
            });
        }

        self.write(&relative, response.body).await?;
        Ok(relative)
    }

    /// Whether a regular file exists at `relative_path`. Errors read as absent.
    pub async fn file_exists(&self, relative_path: &str) -> bool {
        if relative_path.trim().is_empty() {
            return false;
        }
        let path = self.file_url(relative_path);
        match self.fs.metadata(&path).await {
            Ok(meta) => !meta.is_directory,
            Err(_) => false,
        }
    }

    /// Delete a media file. Deleting a missing file is not an error.
    ///
    /// # Returns
    /// - `Ok(true)` if a file was removed
    /// - `Ok(false)` if nothing was there
    pub async fn delete_file(&self, relative_path: &str) -> Result<bool> {
        if !self.file_exists(relative_path).await {
            return Ok(false);
        }

        let path = self.file_url(relative_path);
        match self.fs.delete_file(&path).await {
            Ok(()) => {
                debug!(path = %relative_path, "Deleted media file");
                Ok(true)
            }
            Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(BridgeError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Free bytes under the media root minus the safety margin.
    ///
    /// A failed free-space query yields zero headroom.
    pub async fn available_headroom(&self) -> u64 {
        match self.fs.available_space(&self.root).await {
            Ok(free) => free.saturating_sub(self.config.safety_margin_bytes),
            Err(e) => {
                warn!(error = %e, "Free space query failed; assuming no headroom");
                0
            }
        }
    }

    pub async fn has_space_for_download(&self, estimated_bytes: u64) -> bool {
        estimated_bytes <= self.available_headroom().await
    }

    /// Total bytes of media currently on disk.
    pub async fn media_usage_bytes(&self) -> Result<u64> {
        if !self.fs.exists(&self.root).await? {
            return Ok(0);
        }
        Ok(self.fs.directory_size(&self.root).await?)
    }

    /// Delete every file under the media root not listed in `known_paths`.
    ///
    /// Returns the number of files removed.
    #[instrument(skip_all, fields(known = known_paths.len()))]
    pub async fn remove_orphans(&self, known_paths: &HashSet<String>) -> Result<usize> {
        if !self.fs.exists(&self.root).await? {
            return Ok(0);
        }

        let mut removed = 0;
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            for entry in self.fs.list_directory(&dir).await? {
                let meta = self.fs.metadata(&entry).await?;
                if meta.is_directory {
                    pending.push(entry);
                    continue;
                }

                let Some(relative) = self.relative_of(&entry) else {
                    continue;
                };
                if known_paths.contains(&relative) || paths::is_partial(&relative) {
                    continue;
                }

                match self.fs.delete_file(&entry).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %relative, error = %e, "Failed to remove orphan"),
                }
            }
        }

        info!(removed, "Orphaned media removed");
        Ok(removed)
    }

    fn relative_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    /// Stage `data` next to its final path and rename it into place, so an
    /// interrupted write never leaves a truncated file under `relative`.
    async fn write(&self, relative: &str, data: Bytes) -> Result<()> {
        let path = self.file_url(relative);
        let staged = self.file_url(&paths::partial_path(relative));
        let size = data.len();

        self.fs.write_file(&staged, data).await?;
        if let Err(e) = self.fs.rename(&staged, &path).await {
            if let Err(cleanup) = self.fs.delete_file(&staged).await {
                warn!(path = %relative, error = %cleanup, "Failed to remove staged download");
            }
            return Err(e.into());
        }

        debug!(path = %relative, size, "Media file written");
        Ok(())
    }

    async fn with_timeout<T>(
        &self,
        target: &str,
        fut: impl Future<Output = std::result::Result<T, BridgeError>>,
    ) -> Result<std::result::Result<T, BridgeError>> {
        tokio::time::timeout(self.config.download_timeout, fut)
            .await
            .map_err(|_| FileStoreError::Timeout {
                target: target.to_string(),
                seconds: self.config.download_timeout.as_secs(),
            })
    }
}
