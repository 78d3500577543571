//! File store configuration

use std::time::Duration;

/// Default headroom kept free below raw device free space (200 MiB).
pub const DEFAULT_SAFETY_MARGIN_BYTES: u64 = 200 * 1024 * 1024;

/// Configuration for [`crate::MediaFileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Space kept free below what the device reports (default: 200 MiB)
    pub safety_margin_bytes: u64,

    /// Timeout for a single media download (default: 60s)
    pub download_timeout: Duration,

    /// Blob-store bucket whose URLs are treated as storage paths
    pub storage_bucket: String,

    /// Remote base URL. When set, only storage URLs on this origin are
    /// recognized as blob-store paths.
    pub storage_base_url: Option<String>,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            safety_margin_bytes: DEFAULT_SAFETY_MARGIN_BYTES,
            download_timeout: Duration::from_secs(60),
            storage_bucket: "media".to_string(),
            storage_base_url: None,
        }
    }
}

impl FileStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_safety_margin(mut self, bytes: u64) -> Self {
        self.safety_margin_bytes = bytes;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = bucket.into();
        self
    }

    pub fn with_storage_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.storage_base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.download_timeout.is_zero() {
            return Err("download_timeout must be greater than 0".to_string());
        }

        if self.storage_bucket.trim().is_empty() || self.storage_bucket.contains('/') {
            return Err("storage_bucket must be a single non-empty path segment".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileStoreConfig::default();
        assert_eq!(config.safety_margin_bytes, 200 * 1024 * 1024);
        assert_eq!(config.download_timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = FileStoreConfig::new()
            .with_safety_margin(0)
            .with_storage_bucket("mixes")
            .with_storage_base_url("https://abc.example.co/");

        assert_eq!(config.safety_margin_bytes, 0);
        assert_eq!(config.storage_bucket, "mixes");
        assert_eq!(
            config.storage_base_url.as_deref(),
            Some("https://abc.example.co")
        );
    }

    #[test]
    fn test_config_validation() {
        let zero_timeout = FileStoreConfig::default().with_download_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let nested_bucket = FileStoreConfig::default().with_storage_bucket("a/b");
        assert!(nested_bucket.validate().is_err());
    }
}
