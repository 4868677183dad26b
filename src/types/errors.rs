use thiserror::Error;

// === ValidationError ===

/// Problems with the form detected locally, before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title or URL is empty.
    #[error("Title and URL are both required")]
    MissingFields,
    /// No session identity to own the record.
    #[error("Not signed in")]
    NotSignedIn,
}

// === RemoteError ===

/// Errors reported by the data store or the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The store refused the request (constraint, permission).
    #[error("Request rejected: {0}")]
    Rejected(String),
    /// The table is not served by this store.
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    /// The underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for RemoteError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RemoteError::Rejected(msg.unwrap_or_else(|| code.to_string()))
            }
            other => RemoteError::Storage(other.to_string()),
        }
    }
}

// === AuthError ===

/// Errors reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No account is configured for the requested provider.
    #[error("Unknown auth provider: {0}")]
    UnknownProvider(String),
    /// The provider refused the request.
    #[error("Authentication rejected: {0}")]
    Rejected(String),
    /// The auth service could not be reached.
    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}

// === SyncError ===

/// Every failure the view-state controller can observe, by origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Insert, update or delete rejected by the data store.
    #[error("Remote write failed: {0}")]
    RemoteWrite(RemoteError),
    /// Fetch rejected by the data store.
    #[error("Remote read failed: {0}")]
    RemoteRead(RemoteError),
    #[error("Auth failed: {0}")]
    Auth(#[from] AuthError),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    IoError(String),
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AppError ===

/// Errors raised while wiring the application together.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
