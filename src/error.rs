use crate::types::ImportResult;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ImportError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Prefix the message with `context`, keeping the error kind intact.
    pub fn context(self, context: impl AsRef<str>) -> Self {
        let context = context.as_ref();
        match self {
            Self::InvalidArgument(m) => Self::InvalidArgument(format!("{context}: {m}")),
            Self::Upstream { status, message } => Self::Upstream {
                status,
                message: format!("{context}: {message}"),
            },
            Self::Storage(m) => Self::Storage(format!("{context}: {m}")),
            // Cancellation keeps its message so callers can match on it.
            Self::Cancelled(m) => Self::Cancelled(m),
            Self::Config(m) => Self::Config(format!("{context}: {m}")),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: format!("request failed: {err}"),
        }
    }
}

impl From<libsql::Error> for ImportError {
    fn from(err: libsql::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ImportError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// An import that stopped early. `partial` is set when the per-item loop had
/// already started (cancellation); pre-loop aborts carry `None`.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ImportAbort {
    pub error: ImportError,
    pub partial: Option<ImportResult>,
}

impl ImportAbort {
    pub fn with_partial(error: ImportError, partial: ImportResult) -> Self {
        Self {
            error,
            partial: Some(partial),
        }
    }
}

impl From<ImportError> for ImportAbort {
    fn from(error: ImportError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
