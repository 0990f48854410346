use thiserror::Error;

/// Every failure the catalog run can report.
///
/// `Connection` and `InvalidConfig` end the run. `Operation` and
/// `InvalidDocument` are scoped to a single catalog entry, and the runner
/// moves on to the next one unless it was asked to fail fast.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to connect to {uri}: {source}")]
    Connection {
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("Operation '{operation}' failed: {source:#}")]
    Operation {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },
}

impl CatalogError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn connection(uri: &str, source: mongodb::error::Error) -> Self {
        Self::Connection {
            uri: redact_uri(uri),
            source,
        }
    }

    pub fn operation(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Operation { operation, source }
    }

    pub fn invalid_document<S: Into<String>>(message: S) -> Self {
        Self::InvalidDocument { message: message.into() }
    }

    /// Stable code for log filtering.
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::InvalidConfig { .. } => "INVALID_CONFIG",
            CatalogError::Connection { .. } => "CONNECTION_FAILED",
            CatalogError::Operation { .. } => "OPERATION_FAILED",
            CatalogError::InvalidDocument { .. } => "INVALID_DOCUMENT",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::InvalidConfig { .. } | CatalogError::Connection { .. }
        )
    }
}

/// Hide the user info part of a connection string before it reaches a log line.
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***{}", scheme, &rest[at..]),
        None => uri.to_string(),
    }
}
