//! Error types for Runscope API operations.
//!
//! Errors are categorized so callers can tell an entity that no longer exists
//! remotely (drift) apart from a hard failure without inspecting message text.

use crate::types::EntityKind;
use std::fmt;

/// Result type alias for Runscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The API verb an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// POST to a collection path.
    Create,
    /// GET on an item path.
    Read,
    /// PUT on an item path.
    Update,
    /// DELETE on an item path.
    Delete,
    /// GET on a collection path.
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Create => "creating",
            Self::Read => "reading",
            Self::Update => "updating",
            Self::Delete => "deleting",
            Self::List => "listing",
        };
        f.write_str(verb)
    }
}

/// Categories of Runscope errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Base URL or token is unusable; raised before any request.
    Configuration,
    /// Network, connection or TLS failure.
    Transport,
    /// Response body did not match the expected envelope or record shape.
    Decode,
    /// The remote reports the entity as absent.
    NotFound,
    /// The remote rejected the request.
    Rejected,
    /// The operation is not defined for the entity kind.
    Unsupported,
}

impl ErrorCategory {
    /// Whether this category means the entity is gone and should be dropped
    /// from tracked state rather than reported.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid client configuration",
            Self::Transport => "Network connectivity issue",
            Self::Decode => "Unexpected API response",
            Self::NotFound => "Entity not found",
            Self::Rejected => "Request rejected by the API",
            Self::Unsupported => "Operation not supported",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Check RUNSCOPE_API_URL and RUNSCOPE_ACCESS_TOKEN",
            Self::Transport => "Check your internet connection and try again",
            Self::Decode => "The API may have changed; run with -vv to see the raw response",
            Self::NotFound => "Run `refresh` to drop the entity from tracked state",
            Self::Rejected => "Check the reason reported by the API and your token's permissions",
            Self::Unsupported => "Change the manifest so the entity is recreated instead",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Runscope API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid API response {operation} {kind} {name}: {message}")]
    Decode {
        /// Verb that produced the response.
        operation: Operation,
        /// Entity kind involved.
        kind: EntityKind,
        /// Entity identifier or name.
        name: String,
        /// Decoder message.
        message: String,
    },

    /// The remote answered with a status of 300 or above.
    #[error("{}", rejection_message(.operation, .kind, .name, .status, .reason))]
    Rejected {
        /// Verb that was rejected.
        operation: Operation,
        /// Entity kind involved.
        kind: EntityKind,
        /// Entity identifier or name.
        name: String,
        /// HTTP status code.
        status: u16,
        /// Message from the error envelope, when it could be decoded.
        reason: Option<String>,
    },

    /// The entity kind has no remote update semantics.
    #[error("{kind} {name} cannot be updated in place and must be recreated")]
    UpdateNotSupported {
        /// Entity kind involved.
        kind: EntityKind,
        /// Entity identifier or name.
        name: String,
    },
}

fn rejection_message(
    operation: &Operation,
    kind: &EntityKind,
    name: &str,
    status: &u16,
    reason: &Option<String>,
) -> String {
    match reason {
        Some(reason) => format!("error {operation} {kind} {name}: status {status}, reason: {reason:?}"),
        None => format!("error {operation} {kind} {name}: status {status}"),
    }
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status carried by a remote rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Configuration,
            Error::Transport(_) => ErrorCategory::Transport,
            Error::Decode { .. } => ErrorCategory::Decode,
            Error::Rejected { kind, status, .. } => {
                if kind.absent_statuses().contains(status) {
                    ErrorCategory::NotFound
                } else {
                    ErrorCategory::Rejected
                }
            }
            Error::UpdateNotSupported { .. } => ErrorCategory::Unsupported,
        }
    }

    /// Whether the remote reported the entity as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category().is_absent()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("malformed URL: {err}"))
    }
}
