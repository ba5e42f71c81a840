//! The failure-kind taxonomy exposed to collaborators outside this workspace.
//!
//! Crate-local error enums (`access::AccessError`, `configstore::ConfigError`,
//! ...) carry richer context; this type is the coarse classification a
//! caller outside the workspace would actually branch on, and each
//! crate-local error implements `From` into it.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("range file format error: {0}")]
    FormatError(String),
    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),
    #[error("invalid S2 range file")]
    InvalidS2File,
    #[error("no pending config-updater payload")]
    NoPendingConfig,
}
