//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for on-device file I/O and for the remote
//! blob store that holds uploaded media.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn store_blob(fs: &dyn FileSystemAccess, data: Bytes) -> Result<()> {
///     let data_dir = fs.get_data_directory().await?;
///     fs.write_file(&data_dir.join("media/a.jpg"), data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's cache directory
    ///
    /// This directory is suitable for temporary files that can be deleted
    /// by the system when storage is low.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Get the application's data directory
    ///
    /// This directory is suitable for persistent application data.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it (and its parents) if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Move `from` onto `to`, replacing any existing file.
    ///
    /// Adapters backed by a real filesystem should override this with an
    /// atomic rename. The default copies then deletes.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let data = self.read_file(from).await?;
        self.write_file(to, data).await?;
        self.delete_file(from).await
    }

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Bytes available to the application on the volume holding `path`
    async fn available_space(&self, path: &Path) -> Result<u64>;

    /// Calculate total size of a directory recursively
    async fn directory_size(&self, path: &Path) -> Result<u64> {
        let mut total = 0u64;
        let entries = self.list_directory(path).await?;

        for entry in entries {
            let metadata = self.metadata(&entry).await?;
            if metadata.is_directory {
                total += self.directory_size(&entry).await?;
            } else {
                total += metadata.size;
            }
        }

        Ok(total)
    }
}

/// Remote blob store holding uploaded media, addressed by object path.
///
/// Object paths are namespaced by a generated unique prefix per upload so
/// two uploads of `photo.jpg` never collide.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `path`; returns the stored object path.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<String>;

    /// Download the object stored at `path`.
    async fn download(&self, path: &str) -> Result<Bytes>;

    /// Public URL for `path`. Pure string composition.
    fn public_url(&self, path: &str) -> String;
}

/// Build a collision-free object path for an upload: `<uuid>/<file_name>`.
pub fn unique_object_path(file_name: &str) -> String {
    let trimmed = file_name.trim_start_matches('/');
    format!("{}/{}", uuid::Uuid::new_v4(), trimmed)
}
