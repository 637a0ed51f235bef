//! Error types for the samlmap core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    SideChannel(#[from] SideChannelError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
///
/// These only arise on the strict file-loading path; building a config from
/// an untyped settings table is total and falls back to defaults instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Mapping errors
// ---------------------------------------------------------------------------

/// Errors from the assertion-to-identity mapping.
///
/// A missing subject attribute is fatal to the login attempt and is surfaced
/// by the host runtime as an authorization failure. Missing optional
/// attributes are never errors; they degrade to empty or absent values.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The configured subject attribute is absent from the assertion.
    #[error("'{attribute}' not in SSO assertion")]
    MissingRequiredAttribute {
        attribute: String,
    },
}

// ---------------------------------------------------------------------------
// Audit side-channel errors
// ---------------------------------------------------------------------------

/// Errors from the audit side channels (relational store and flat file).
///
/// A side-channel failure never alters or aborts a computed identity; the
/// provider logs these and returns the identity regardless.
#[derive(Debug, Error)]
pub enum SideChannelError {
    /// Audit store connection or insert failure.
    #[error("audit store write failed: {0}")]
    Store(#[from] postgres::Error),

    /// Audit log file append failure.
    #[error("audit log write failed: {0}")]
    Log(#[from] std::io::Error),

    /// Every configured audit channel failed for one record.
    #[error("all audit channels failed: {0}")]
    AllChannelsFailed(String),
}
