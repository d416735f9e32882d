use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Venue store unavailable during {operation}: {message}")]
    StoreUnavailable { operation: String, message: String },

    #[error("Venue store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "db")]
    #[error("Database error: {message}")]
    Database { message: String },
}

impl ResolverError {
    pub fn store_unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ResolverError::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Failures that mean "the store could not answer", which the resolver
    /// downgrades to `NotFound` instead of surfacing.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            ResolverError::StoreUnavailable { .. } | ResolverError::Timeout { .. } => true,
            #[cfg(feature = "db")]
            ResolverError::Database { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolverError>;
