// mldata-core/src/error.rs

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {

    #[error("'{key}' not found")]
    NotFound {
        key: String,
    },

    #[error("content for element '{id}' is missing from the fetched bundle")]
    ContentMissing {
        id: String,
    },

    #[error("content for element '{id}' could not be fetched")]
    Content {
        id: String,
        #[source]
        source: Arc<ClientError>,
    },

    #[error("Remote request to '{endpoint}' failed: {message}")]
    Remote {
        endpoint: String,
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error at '{path}': {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Background task failed: {message}")]
    Task {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

// Convenience constructors
impl ClientError {

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn content_missing(id: impl Into<String>) -> Self {
        Self::ContentMissing { id: id.into() }
    }

    pub fn content(id: impl Into<String>, source: Arc<ClientError>) -> Self {
        Self::Content {
            id: id.into(),
            source,
        }
    }

    pub fn remote(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            status: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            status: Some(status),
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_with_source(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Remote {
            endpoint: endpoint.into(),
            status: None,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// True for local not-found errors and for remote 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Remote { status: Some(404), .. }
        )
    }
}

impl From<tokio::task::JoinError> for ClientError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::task("task was cancelled")
        } else {
            Self::task(format!("task panicked: {}", err))
        }
    }
}
