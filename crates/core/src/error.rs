#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown study type: {0}")]
    UnknownStudyType(String),
    #[error("range catalog unavailable (path: {path}): {source}", path = path.display())]
    CatalogUnavailable {
        path: std::path::PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type LabResult<T> = std::result::Result<T, LabError>;

#[derive(Debug, thiserror::Error)]
pub enum PostalError {
    #[error("invalid postal code {0:?}: must be exactly 5 digits")]
    InvalidPostalCode(String),
    #[error("postal lookup timed out after {0} seconds")]
    LookupTimeout(u64),
    #[error("postal lookup transport failure: {0}")]
    LookupTransportError(String),
    #[error("postal code not found: {0}")]
    LookupNotFound(String),
}

pub type PostalResult<T> = std::result::Result<T, PostalError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
