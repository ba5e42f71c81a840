//! `ConfigStore` arbitrates between the overlay defaults, a
//! config-updater payload, and a test override, exposing exactly one
//! active [`ConfigSnapshot`] at a time.

use crate::overlay::OverlayConfig;
use crate::persistence::{CachedVerdictState, PersistedState};
use crate::snapshot::{ConfigSnapshot, OverlaySource};
use crate::validation::{self, ConfigUpdatePayload};
use shared::{CountryCode, FailureKind, Mode};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_UPDATER_RANGE_FILE_NAME: &str = "config_updater_range.bin";
const PERSISTED_STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Overlay(#[from] crate::overlay::ConfigFileError),
    #[error(transparent)]
    Persistence(#[from] crate::persistence::PersistenceError),
    #[error(transparent)]
    Validation(#[from] validation::ValidationError),
    #[error("no config-updater payload has ever been accepted")]
    NoPendingConfig,
}

impl From<ConfigError> for FailureKind {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => FailureKind::IoError(e.to_string()),
            ConfigError::Overlay(e) => FailureKind::IoError(e.to_string()),
            ConfigError::Persistence(e) => FailureKind::IoError(e.to_string()),
            ConfigError::Validation(e) => e.into(),
            ConfigError::NoPendingConfig => FailureKind::NoPendingConfig,
        }
    }
}

/// Parameters for `set_test_override`: supersedes both the overlay and
/// config-updater snapshots until reset. Never persisted.
#[derive(Clone, Debug)]
pub struct TestOverride {
    pub is_allow_list: bool,
    pub country_codes: Vec<CountryCode>,
    pub range_file_path: Option<PathBuf>,
    pub location_fresh_duration: Duration,
}

struct Inner {
    overlay_snapshot: Arc<ConfigSnapshot>,
    config_updater_snapshot: Option<Arc<ConfigSnapshot>>,
    test_override_snapshot: Option<Arc<ConfigSnapshot>>,
}

impl Inner {
    fn active(&self) -> Arc<ConfigSnapshot> {
        self.test_override_snapshot
            .clone()
            .or_else(|| self.config_updater_snapshot.clone())
            .unwrap_or_else(|| self.overlay_snapshot.clone())
    }
}

/// Owns the private directory this crate keeps its copied range files
/// and persisted state under, and the single arbitration cell every
/// reader goes through.
pub struct ConfigStore {
    private_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl ConfigStore {
    /// Loads the overlay defaults, then layers in any persisted
    /// config-updater values from a previous run.
    pub fn load(overlay: OverlayConfig, private_dir: PathBuf) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(&private_dir)?;

        let overlay_snapshot = Arc::new(ConfigSnapshot {
            country_codes: overlay.country_codes.iter().cloned().collect(),
            mode: overlay.mode,
            range_file_path: overlay.range_file_path.clone(),
            location_fresh_duration: overlay.location_fresh_duration,
            overlay_source: OverlaySource::Overlay,
        });

        let persisted = PersistedState::load(&private_dir.join(PERSISTED_STATE_FILE_NAME))?;
        let config_updater_snapshot = if let Some(mode) = persisted.config_updater_mode {
            let range_path = private_dir.join(CONFIG_UPDATER_RANGE_FILE_NAME);
            let range_file_path = range_path.exists().then_some(range_path);
            info!("restored persisted config-updater snapshot from previous run");
            Some(Arc::new(ConfigSnapshot {
                country_codes: persisted.config_updater_country_codes.clone(),
                mode,
                range_file_path,
                location_fresh_duration: overlay_snapshot.location_fresh_duration,
                overlay_source: OverlaySource::ConfigUpdater,
            }))
        } else {
            None
        };

        Ok(ConfigStore {
            private_dir,
            inner: Mutex::new(Inner {
                overlay_snapshot,
                config_updater_snapshot,
                test_override_snapshot: None,
            }),
        })
    }

    fn persisted_state_path(&self) -> PathBuf {
        self.private_dir.join(PERSISTED_STATE_FILE_NAME)
    }

    fn config_updater_range_path(&self) -> PathBuf {
        self.private_dir.join(CONFIG_UPDATER_RANGE_FILE_NAME)
    }

    /// The currently active snapshot, precedence Test > ConfigUpdater >
    /// Overlay.
    pub fn active_snapshot(&self) -> Arc<ConfigSnapshot> {
        self.inner.lock().unwrap().active()
    }

    /// Validates and adopts a new config-updater payload. On any
    /// validation failure the active snapshot and persisted state are
    /// left untouched; the snapshot only advances on full success.
    pub fn apply_config_update(&self, payload: ConfigUpdatePayload) -> Result<(), ConfigError> {
        let codes = validation::validate_country_codes(&payload.country_codes)?;
        // `is_allowed_for_region` is the sole source of allow-vs-deny
        // mode; there is no separate field that could disagree with it.
        let mode = match payload.is_allowed_for_region {
            Some(true) => Mode::AllowList,
            Some(false) => Mode::DenyList,
            None => return Err(validation::ValidationError::MissingIsAllowedForRegion.into()),
        };

        let dest = self.config_updater_range_path();
        std::fs::copy(&payload.range_file_path, &dest)?;
        if let Err(err) = validation::validate_range_file(&dest) {
            let _ = std::fs::remove_file(&dest);
            warn!(?err, "rejecting config-updater payload: range file failed validation");
            return Err(err.into());
        }

        let country_codes: BTreeSet<CountryCode> = codes.into_iter().collect();
        let location_fresh_duration = self.active_snapshot().location_fresh_duration;
        let snapshot = Arc::new(ConfigSnapshot {
            country_codes: country_codes.clone(),
            mode,
            range_file_path: Some(dest),
            location_fresh_duration,
            overlay_source: OverlaySource::ConfigUpdater,
        });

        let mut persisted = PersistedState::load(&self.persisted_state_path())?;
        persisted.config_updater_country_codes = country_codes;
        persisted.config_updater_mode = Some(mode);
        persisted.save(&self.persisted_state_path())?;

        let mut inner = self.inner.lock().unwrap();
        inner.config_updater_snapshot = Some(snapshot);
        info!("adopted new config-updater snapshot");
        Ok(())
    }

    /// Installs a test override that supersedes both other sources until
    /// [`ConfigStore::reset_test_override`] is called. Never persisted.
    pub fn set_test_override(&self, override_: TestOverride) {
        let location_fresh_duration = override_.location_fresh_duration;
        let snapshot = Arc::new(ConfigSnapshot {
            country_codes: override_.country_codes.into_iter().collect(),
            mode: if override_.is_allow_list {
                Mode::AllowList
            } else {
                Mode::DenyList
            },
            range_file_path: override_.range_file_path,
            location_fresh_duration,
            overlay_source: OverlaySource::Test,
        });
        self.inner.lock().unwrap().test_override_snapshot = Some(snapshot);
    }

    pub fn reset_test_override(&self) {
        self.inner.lock().unwrap().test_override_snapshot = None;
    }

    /// Persists the orchestrator's latest verdict so it survives a
    /// restart.
    pub fn persist_verdict(&self, allowed: bool, set_time_ns: u64) -> Result<(), ConfigError> {
        let path = self.persisted_state_path();
        let mut persisted = PersistedState::load(&path)?;
        persisted.latest_allowed = Some(allowed);
        persisted.latest_allowed_set_time_ns = Some(set_time_ns);
        persisted.save(&path)?;
        Ok(())
    }

    /// The last persisted verdict, if any, used by the orchestrator's
    /// cached-country-code fallback branch when a fresh location isn't
    /// available.
    pub fn recall_verdict(&self) -> Result<Option<(bool, u64)>, ConfigError> {
        let persisted = PersistedState::load(&self.persisted_state_path())?;
        Ok(persisted
            .latest_allowed
            .zip(persisted.latest_allowed_set_time_ns))
    }

    /// Clears the persisted cached verdict without touching the
    /// config-updater country list/mode.
    pub fn clear_persisted_verdict(&self) -> Result<(), ConfigError> {
        let path = self.persisted_state_path();
        let mut persisted = PersistedState::load(&path)?;
        persisted.latest_allowed = None;
        persisted.latest_allowed_set_time_ns = None;
        persisted.save(&path)?;
        Ok(())
    }

    /// Test-only hook for driving the persisted verdict into a specific
    /// state without going through a real orchestrator check.
    pub fn set_cached_verdict_state(
        &self,
        state: CachedVerdictState,
        set_time_ns: u64,
    ) -> Result<(), ConfigError> {
        match state {
            CachedVerdictState::CacheAllowed => self.persist_verdict(true, set_time_ns),
            CachedVerdictState::CacheClearAndNotAllowed => {
                self.clear_persisted_verdict()?;
                self.persist_verdict(false, set_time_ns)
            }
            CachedVerdictState::ClearCacheOnly => self.clear_persisted_verdict(),
        }
    }

    pub fn private_dir(&self) -> &Path {
        &self.private_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::rangefile::test_support::write_range_file;

    fn overlay() -> OverlayConfig {
        OverlayConfig {
            country_codes: vec![CountryCode::parse("US").unwrap()],
            mode: Mode::AllowList,
            range_file_path: None,
            location_fresh_duration: Duration::from_secs(600),
        }
    }

    #[test]
    fn overlay_is_active_with_no_config_updater_or_override() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();
        let snapshot = store.active_snapshot();
        assert_eq!(snapshot.overlay_source, OverlaySource::Overlay);
    }

    #[test]
    fn config_updater_payload_supersedes_overlay_once_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);

        store
            .apply_config_update(ConfigUpdatePayload {
                country_codes: vec!["FR".to_string(), "DE".to_string()],
                is_allowed_for_region: Some(true),
                range_file_path: range_path,
            })
            .unwrap();

        let snapshot = store.active_snapshot();
        assert_eq!(snapshot.overlay_source, OverlaySource::ConfigUpdater);
        assert!(snapshot.is_country_in_list(&CountryCode::parse("FR").unwrap()));
        assert!(snapshot.range_file_path.is_some());
    }

    #[test]
    fn rejected_config_update_leaves_overlay_active() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();

        let bad_range_path = dir.path().join("bad.bin");
        std::fs::write(&bad_range_path, b"not a range file").unwrap();

        let result = store.apply_config_update(ConfigUpdatePayload {
            country_codes: vec!["FR".to_string()],
            is_allowed_for_region: Some(true),
            range_file_path: bad_range_path,
        });

        assert!(result.is_err());
        assert_eq!(store.active_snapshot().overlay_source, OverlaySource::Overlay);
    }

    #[test]
    fn config_update_missing_is_allowed_for_region_leaves_overlay_active() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);

        let result = store.apply_config_update(ConfigUpdatePayload {
            country_codes: vec!["FR".to_string()],
            is_allowed_for_region: None,
            range_file_path: range_path,
        });

        assert!(matches!(
            result,
            Err(ConfigError::Validation(validation::ValidationError::MissingIsAllowedForRegion))
        ));
        assert_eq!(store.active_snapshot().overlay_source, OverlaySource::Overlay);
    }

    #[test]
    fn test_override_takes_precedence_over_config_updater() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);
        store
            .apply_config_update(ConfigUpdatePayload {
                country_codes: vec!["FR".to_string()],
                is_allowed_for_region: Some(true),
                range_file_path: range_path,
            })
            .unwrap();

        store.set_test_override(TestOverride {
            is_allow_list: false,
            country_codes: vec![CountryCode::parse("JP").unwrap()],
            range_file_path: None,
            location_fresh_duration: Duration::from_secs(1),
        });

        let snapshot = store.active_snapshot();
        assert_eq!(snapshot.overlay_source, OverlaySource::Test);
        assert_eq!(snapshot.mode, Mode::DenyList);

        store.reset_test_override();
        assert_eq!(store.active_snapshot().overlay_source, OverlaySource::ConfigUpdater);
    }

    #[test]
    fn persisted_verdict_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(overlay(), dir.path().join("private")).unwrap();

        assert_eq!(store.recall_verdict().unwrap(), None);
        store.persist_verdict(true, 1_000).unwrap();
        assert_eq!(store.recall_verdict().unwrap(), Some((true, 1_000)));

        store.clear_persisted_verdict().unwrap();
        assert_eq!(store.recall_verdict().unwrap(), None);
    }

    #[test]
    fn restores_persisted_config_updater_snapshot_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let private_dir = dir.path().join("private");

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);
        {
            let store = ConfigStore::load(overlay(), private_dir.clone()).unwrap();
            store
                .apply_config_update(ConfigUpdatePayload {
                    country_codes: vec!["FR".to_string()],
                    is_allowed_for_region: Some(true),
                    range_file_path: range_path,
                })
                .unwrap();
        }

        let reloaded = ConfigStore::load(overlay(), private_dir).unwrap();
        let snapshot = reloaded.active_snapshot();
        assert_eq!(snapshot.overlay_source, OverlaySource::ConfigUpdater);
        assert!(snapshot.is_country_in_list(&CountryCode::parse("FR").unwrap()));
    }
}
