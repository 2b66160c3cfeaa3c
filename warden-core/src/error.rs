//! Top-level error types for warden
//!
//! This module provides the crate-level error type that flattens the
//! internal error hierarchy into actionable categories.
//!
//! Note that a denied permission is *not* an error: denials are a normal
//! governed outcome and are returned to callers as a structured
//! [`ExecutionResult`](crate::pipeline::ExecutionResult).

use thiserror::Error;

use crate::audit::AuditLogError;
use crate::config::ConfigError;
use crate::permission::PermissionStoreError;

/// Top-level error type for warden operations
///
/// This enum provides a flattened view of errors, categorized by how callers
/// typically need to handle them:
///
/// - [`Error::InvalidRole`] - the role name does not exist in the registry
/// - [`Error::AuditWrite`] - an audit entry could not be persisted
/// - [`Error::Store`] - the permission store failed to read or write
/// - [`Error::Config`] - configuration could not be loaded or is invalid
/// - [`Error::Recommendation`] - a recommendation lifecycle operation failed
///
/// Backend failures and timeouts are likewise not errors here: they reach
/// callers inside the [`ExecutionResult`](crate::pipeline::ExecutionResult)
/// with a machine-readable
/// [`ExecutionErrorKind`](crate::pipeline::ExecutionErrorKind).
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown role name in an assignment or lookup call
    #[error("unknown role: {0}")]
    InvalidRole(String),

    /// An audit entry could not be written to durable storage
    ///
    /// This is a hard error: audited-and-failed is the only acceptable end
    /// state for a permitted action, so a failed audit write must never be
    /// reported as a successful call.
    #[error("audit write failed: {0}")]
    AuditWrite(String),

    /// Permission store read or write failure
    #[error("permission store error: {0}")]
    Store(String),

    /// Configuration error (unreadable file, malformed role definitions)
    #[error("configuration error: {0}")]
    Config(String),

    /// Recommendation lifecycle error (unknown id, non-executable kind)
    #[error("recommendation error: {0}")]
    Recommendation(String),
}

impl Error {
    /// Returns true if this is an unknown-role error
    pub fn is_invalid_role(&self) -> bool {
        matches!(self, Self::InvalidRole(_))
    }

    /// Returns true if this is an audit persistence failure
    pub fn is_audit_write(&self) -> bool {
        matches!(self, Self::AuditWrite(_))
    }

    /// Returns true if this is a permission store failure
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a recommendation lifecycle error
    pub fn is_recommendation(&self) -> bool {
        matches!(self, Self::Recommendation(_))
    }
}

impl From<PermissionStoreError> for Error {
    fn from(err: PermissionStoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<AuditLogError> for Error {
    fn from(err: AuditLogError) -> Self {
        Self::AuditWrite(err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for warden operations
pub type Result<T> = std::result::Result<T, Error>;
