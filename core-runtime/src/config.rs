//! # Core Configuration Module
//!
//! Provides configuration management for the mix core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core.
//! It enforces fail-fast validation so a misconfigured host learns what is
//! missing at startup rather than on the first sync pass.
//!
//! ## Required Settings
//!
//! - database path for the local store
//! - media directory for downloaded blobs
//! - remote endpoint (`base_url`, `api_key`, `storage_bucket`)
//!
//! ## Bridges (with desktop defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `FileSystemAccess` - File I/O (desktop default: tokio fs)
//!
//! When the `desktop-shims` feature is enabled, the desktop bridges are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, RemoteEndpoint};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/mix.db")
//!     .media_dir("/path/to/media")
//!     .remote(RemoteEndpoint::new("https://project.example.co", "anon-key", "media"))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::redact_if_sensitive;
use bridge_traits::{FileSystemAccess, HttpClient};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Location and credentials of the hosted backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Project base URL, e.g. `https://project.example.co`
    pub base_url: String,
    /// Anonymous API key sent as `apikey` and bearer token
    pub api_key: String,
    /// Blob-store bucket holding uploaded media
    pub storage_bucket: String,
}

impl RemoteEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        storage_bucket: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            storage_bucket: storage_bucket.into(),
        }
    }

    /// Validates the endpoint fields.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Remote base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.api_key.trim().is_empty() {
            return Err(Error::Config("Remote API key cannot be empty".to_string()));
        }

        if self.storage_bucket.trim().is_empty() || self.storage_bucket.contains('/') {
            return Err(Error::Config(
                "Storage bucket must be a single non-empty path segment".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &redact_if_sensitive("api_key", &self.api_key))
            .field("storage_bucket", &self.storage_bucket)
            .finish()
    }
}

/// Core configuration for the mix core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory downloaded media is written under
    pub media_dir: PathBuf,

    /// Hosted backend location
    pub remote: RemoteEndpoint,

    /// HTTP client for row-store, blob-store and external downloads
    pub http_client: Arc<dyn HttpClient>,

    /// File system access abstraction
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("media_dir", &self.media_dir)
            .field("remote", &self.remote)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.media_dir.as_os_str().is_empty() {
            return Err(Error::Config("Media directory cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.remote.validate()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter with .http_client()."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(media_dir: &std::path::Path) -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let root = media_dir
        .parent()
        .map(|parent| parent.to_path_buf())
        .unwrap_or_else(|| media_dir.to_path_buf());
    let fs: Arc<dyn FileSystemAccess> =
        Arc::new(TokioFileSystem::with_directories(root.join("cache"), root));
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(_media_dir: &std::path::Path) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "No file system implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Other hosts: inject a sandboxed adapter with .file_system()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    media_dir: Option<PathBuf>,
    remote: Option<RemoteEndpoint>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/path/to/mix.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the directory downloaded media is stored under.
    pub fn media_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.media_dir = Some(path.into());
        self
    }

    /// Sets the remote endpoint.
    pub fn remote(mut self, endpoint: RemoteEndpoint) -> Self {
        self.remote = Some(endpoint);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based desktop client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the event bus capacity. Default: 100.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a required setting is missing, a bridge has no
    /// implementation available, or a value is invalid.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let media_dir = self.media_dir.ok_or_else(|| {
            Error::Config("Media directory is required. Use .media_dir() to set it.".to_string())
        })?;

        let remote = self.remote.ok_or_else(|| {
            Error::Config("Remote endpoint is required. Use .remote() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(&media_dir)?,
        };

        let config = CoreConfig {
            database_path,
            media_dir,
            remote,
            http_client,
            file_system,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
