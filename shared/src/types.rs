//! Value types shared across the policy core.

use std::fmt;

/// An ISO-3166 alpha-2 country code, always stored upper-cased.
///
/// Construction validates shape only (two ASCII letters) — this crate has
/// no gazetteer of real country codes, matching `configstore`'s own
/// validation of config-updater payloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidCountryCode> {
        let upper = raw.to_ascii_uppercase();
        if upper.len() == 2 && upper.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(CountryCode(upper))
        } else {
            Err(InvalidCountryCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = InvalidCountryCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CountryCode::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

/// A code list is malformed — the offending input is carried for logging.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid ISO-3166 alpha-2 country code: {0:?}")]
pub struct InvalidCountryCode(pub String);

/// Whether a range file (or a country-code list) enumerates where
/// satellite access is *permitted* or where it is *prohibited*.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    AllowList,
    DenyList,
}

/// Result code returned to the caller of `request_is_allowed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    RequestNotSupported,
    LocationNotAvailable,
    /// A code forwarded verbatim from the satellite-supported/provisioned
    /// query, for precondition failures that are not simply "false".
    Forwarded(u32),
}

/// Returned by `register_allowed_state_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationCode {
    Ok,
    RequestNotSupported,
}
