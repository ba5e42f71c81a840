//! The on-device geofence engine: S2 cell encoding, a read-only range-file
//! reader, the controller that pins allow-list-vs-deny-list policy on top
//! of it, and the bounded verdict cache the orchestrator memoizes into.
//!
//! Spec components A–D.

pub mod cache;
pub mod controller;
pub mod rangefile;
pub mod s2;
pub mod token;

pub use cache::VerdictCache;
pub use controller::{AccessController, OnDeviceController};
pub use rangefile::{RangeFile, RangeFileError};
pub use token::LocationToken;

#[cfg(any(test, feature = "test-support"))]
pub use rangefile::test_support;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("I/O error opening range file: {0}")]
    Io(#[from] std::io::Error),
    #[error("range file format error: {0}")]
    Format(#[from] RangeFileError),
}

impl From<AccessError> for shared::FailureKind {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Io(e) => shared::FailureKind::IoError(e.to_string()),
            AccessError::Format(e) => shared::FailureKind::FormatError(e.to_string()),
        }
    }
}
