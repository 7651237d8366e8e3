#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the exporter crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Two error types live here. [`Error`] is returned by configuration loading,
//! client construction and exposition, and is fatal to the binary.
//! [`QueryError`] describes a single failed remote query; the collection
//! cycle records it and moves on.

use std::path::{Path, PathBuf};

/// Unified error type returned by configuration loading, client
/// construction and exposition.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading or writing files.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps I/O errors that occur while reading the token file.
    #[error("failed to read token file {path:?}: {source}")]
    TokenIo {
        /// Location of the token file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Service errors when interacting with external APIs.
    #[error("service error: {message}")]
    Service {
        /// Human readable message describing the service error.
        message: String
    },
    /// Wraps registry and encoder errors raised while rendering metrics.
    #[error("failed to render metrics: {source}")]
    Exposition {
        /// Underlying error reported by the prometheus crate.
        source: prometheus::Error
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a service error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the service error.
    pub fn service<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Service {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<prometheus::Error> for Error {
    fn from(source: prometheus::Error) -> Self {
        Self::Exposition {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::TokenIo`] variant capturing the failing path and
/// source.
pub fn token_io_error(path: &Path, source: std::io::Error) -> Error {
    Error::TokenIo {
        path: path.to_path_buf(),
        source
    }
}

/// Failure of a single remote query.
///
/// Every variant maps to a stable [`reason`](Self::reason) string used as a
/// label on the failure gauge. [`is_transient`](Self::is_transient) decides
/// whether the GitHub client retries the call.
#[derive(Debug, Clone, PartialEq, Eq, masterror::Error)]
pub enum QueryError {
    /// The request never produced an HTTP response.
    #[error("transport failure for {entity}: {message}")]
    Transport {
        /// Entity the query targeted.
        entity:  String,
        /// Transport error description.
        message: String
    },
    /// The API rejected the credentials.
    #[error("unauthorized request for {entity}: {message}")]
    Unauthorized {
        /// Entity the query targeted.
        entity:  String,
        /// Rejection description.
        message: String
    },
    /// The API resolved the entity to `null`.
    #[error("{entity} was not found")]
    NotFound {
        /// Entity the query targeted.
        entity: String
    },
    /// The response did not match the expected shape.
    #[error("malformed response for {entity}: {message}")]
    Malformed {
        /// Entity the query targeted.
        entity:  String,
        /// Decoding error description.
        message: String
    },
    /// The attempt exceeded the client timeout.
    #[error("query for {entity} timed out after {seconds}s")]
    Timeout {
        /// Entity the query targeted.
        entity:  String,
        /// Timeout that elapsed.
        seconds: u64
    },
    /// The API answered with GraphQL errors and no data.
    #[error("graphql errors for {entity}: {message}")]
    Graphql {
        /// Entity the query targeted.
        entity:  String,
        /// Concatenated GraphQL error messages.
        message: String
    },
    /// The task running the query panicked or was aborted.
    #[error("query task for {entity} did not complete: {message}")]
    Task {
        /// Entity the query targeted.
        entity:  String,
        /// Join error description.
        message: String
    }
}

impl QueryError {
    /// Every value [`QueryError::reason`] can return.
    pub const REASONS: [&'static str; 7] = [
        "transport",
        "unauthorized",
        "not_found",
        "malformed",
        "timeout",
        "graphql",
        "task"
    ];

    /// Stable, low-cardinality identifier of the failure class.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Malformed { .. } => "malformed",
            Self::Timeout { .. } => "timeout",
            Self::Graphql { .. } => "graphql",
            Self::Task { .. } => "task"
        }
    }

    /// Returns `true` when retrying the same query may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}
