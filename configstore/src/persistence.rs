//! On-disk persisted state — the config-updater's last accepted
//! country list/mode and the orchestrator's last verdict, surviving
//! restarts. Encoded as JSON for human-readability across debugging
//! sessions; see `DESIGN.md` for the tradeoff.

use serde::{Deserialize, Serialize};
use shared::{CountryCode, Mode};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Everything this crate keeps across restarts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub latest_allowed: Option<bool>,
    pub latest_allowed_set_time_ns: Option<u64>,
    pub config_updater_country_codes: BTreeSet<CountryCode>,
    pub config_updater_mode: Option<Mode>,
}

impl PersistedState {
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        if !path.exists() {
            return Ok(PersistedState::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes `self` to `path`, `fsync`ing before returning so a crash
    /// right after this call can never observe a half-written file —
    /// the same durability contract `configstore`'s range-file copy
    /// step relies on.
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error persisting config state: {0}")]
    Io(#[from] std::io::Error),
    #[error("persisted state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Test-only override of the cached verdict, driven through
/// `set_cached_verdict_state`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachedVerdictState {
    CacheAllowed,
    CacheClearAndNotAllowed,
    ClearCacheOnly,
}
