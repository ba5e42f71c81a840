//! Validation of an incoming config-updater payload.
//!
//! Country codes are checked for ISO-3166 alpha-2 *shape* only — this
//! crate carries no gazetteer of real country codes. The accompanying
//! range file is validated by actually opening it through
//! `access::controller`, then closing it immediately; a payload is only
//! accepted once both checks pass.

use access::OnDeviceController;
use shared::{CountryCode, FailureKind};
use std::path::{Path, PathBuf};

/// Raw input describing a new config-updater-provided policy, before it
/// has been validated or copied into the private directory.
///
/// `is_allowed_for_region` is the sole source of truth for allow-vs-deny
/// mode — there is deliberately no separate `mode` field a caller could
/// pass out of sync with it.
#[derive(Clone, Debug)]
pub struct ConfigUpdatePayload {
    pub country_codes: Vec<String>,
    pub is_allowed_for_region: Option<bool>,
    pub range_file_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid ISO-3166 alpha-2 country code: {0:?}")]
    InvalidCountryCode(String),
    #[error("config-updater payload is missing is_allowed_for_region")]
    MissingIsAllowedForRegion,
    #[error("config-updater range file failed validation: {0}")]
    InvalidRangeFile(#[from] access::AccessError),
}

impl From<ValidationError> for FailureKind {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidCountryCode(code) => FailureKind::InvalidCountryCode(code),
            ValidationError::MissingIsAllowedForRegion => FailureKind::InvalidS2File,
            ValidationError::InvalidRangeFile(_) => FailureKind::InvalidS2File,
        }
    }
}

/// Parses and shape-validates every code in `raw_codes`, short-circuiting
/// on the first invalid one.
pub fn validate_country_codes(raw_codes: &[String]) -> Result<Vec<CountryCode>, ValidationError> {
    raw_codes
        .iter()
        .map(|raw| CountryCode::parse(raw).map_err(|_| ValidationError::InvalidCountryCode(raw.clone())))
        .collect()
}

/// Opens `path` through the same validation the orchestrator relies on
/// at lookup time, then immediately closes it — this call exists only to
/// prove the file is well-formed before it's adopted.
pub fn validate_range_file(path: &Path) -> Result<(), ValidationError> {
    let controller = OnDeviceController::open(path)?;
    controller.close();
    Ok(())
}
