use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("File store error: {0}")]
    FileStore(#[from] core_cache::FileStoreError),

    #[error("Remote error: {0}")]
    Remote(#[from] provider_remote::RemoteError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
