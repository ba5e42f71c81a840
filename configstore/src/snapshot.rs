//! The immutable, atomically-swapped view of "what is the active config
//! right now", feeding rule evaluation and the orchestrator's fallback
//! branches.

use shared::{CountryCode, Mode};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Which of the three sources produced the currently active snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlaySource {
    Overlay,
    ConfigUpdater,
    Test,
}

/// A fully resolved, ready-to-use configuration — the orchestrator reads
/// one of these per decision rather than reaching into `ConfigStore`
/// internals, so a config swap can never be observed half-applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigSnapshot {
    pub country_codes: BTreeSet<CountryCode>,
    pub mode: Mode,
    pub range_file_path: Option<PathBuf>,
    pub location_fresh_duration: Duration,
    pub overlay_source: OverlaySource,
}

impl ConfigSnapshot {
    pub fn is_country_in_list(&self, code: &CountryCode) -> bool {
        self.country_codes.contains(code)
    }
}
