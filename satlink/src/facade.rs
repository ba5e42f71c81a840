//! The boundary façade: the only thing outside this workspace ever
//! talks to. Thin — it owns the orchestrator task and translates the
//! public request surface into messages.

use configstore::{ConfigStore, ConfigUpdatePayload, TestOverride};
use orchestrator::{CheckReply, NotifySink, OrchestratorDeps, OrchestratorHandle, SubscriberHandle};
use shared::deps::{ConfigDelivery, SubId};
use shared::{CountryCode, Mode, RegistrationCode, ResultCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `set_test_override`'s input shape.
#[derive(Clone, Debug)]
pub struct TestOverrideRequest {
    pub reset: bool,
    pub is_allow_list: bool,
    pub range_file_path: Option<std::path::PathBuf>,
    pub location_fresh_duration_ns: u64,
    pub country_codes: Vec<String>,
}

pub struct Satlink {
    orchestrator: OrchestratorHandle,
    config_store: Arc<ConfigStore>,
    config_delivery: Arc<dyn ConfigDelivery>,
    /// Feature-flag gate: when disabled, requests reply
    /// `REQUEST_NOT_SUPPORTED` without ever reaching the orchestrator.
    feature_enabled: AtomicBool,
    /// Mirrors the "mock modem allowed" system property gating
    /// `set_test_override`; passed in rather than read from a real
    /// property store, which this workspace doesn't own.
    mock_modem_allowed_property: AtomicBool,
}

impl Satlink {
    pub fn new(
        deps: OrchestratorDeps,
        config_store: Arc<ConfigStore>,
        config_delivery: Arc<dyn ConfigDelivery>,
    ) -> Self {
        let orchestrator = orchestrator::Orchestrator::spawn(deps, config_store.clone());
        Satlink {
            orchestrator,
            config_store,
            config_delivery,
            feature_enabled: AtomicBool::new(true),
            mock_modem_allowed_property: AtomicBool::new(false),
        }
    }

    pub fn set_feature_enabled(&self, enabled: bool) {
        self.feature_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_mock_modem_allowed_property(&self, allowed: bool) {
        self.mock_modem_allowed_property.store(allowed, Ordering::SeqCst);
    }

    pub async fn request_is_allowed(&self, sub_id: SubId) -> CheckReply {
        if !self.feature_enabled.load(Ordering::SeqCst) {
            return CheckReply {
                code: ResultCode::RequestNotSupported,
                allowed: None,
            };
        }
        self.orchestrator.check(sub_id).await
    }

    pub async fn register_allowed_state_listener(
        &self,
        sub_id: SubId,
        sink: Box<dyn NotifySink>,
    ) -> (RegistrationCode, Option<SubscriberHandle>) {
        if !self.feature_enabled.load(Ordering::SeqCst) {
            return (RegistrationCode::RequestNotSupported, None);
        }
        self.orchestrator.register_subscriber(sub_id, sink).await
    }

    pub async fn unregister_allowed_state_listener(&self, handle: SubscriberHandle) {
        self.orchestrator.unregister_subscriber(handle).await;
    }

    /// Returns `false` without applying anything if the mock-modem
    /// property isn't set.
    pub fn set_test_override(&self, request: TestOverrideRequest) -> bool {
        if !self.mock_modem_allowed_property.load(Ordering::SeqCst) {
            return false;
        }
        if request.reset {
            self.config_store.reset_test_override();
            return true;
        }
        let country_codes: Result<Vec<CountryCode>, _> = request
            .country_codes
            .iter()
            .map(|c| CountryCode::parse(c))
            .collect();
        let Ok(country_codes) = country_codes else {
            return false;
        };
        self.config_store.set_test_override(TestOverride {
            is_allow_list: request.is_allow_list,
            country_codes,
            range_file_path: request.range_file_path,
            location_fresh_duration: Duration::from_nanos(request.location_fresh_duration_ns),
        });
        true
    }

    /// Test-only hook for driving the persisted verdict into a specific
    /// state.
    pub fn set_cached_verdict_state(
        &self,
        state: configstore::CachedVerdictState,
        set_time_ns: u64,
    ) -> Result<(), configstore::ConfigError> {
        self.config_store.set_cached_verdict_state(state, set_time_ns)
    }

    /// Pulls whatever config-updater payload is pending, validates and
    /// adopts it through `configstore`, and only on success notifies the
    /// orchestrator with `ConfigUpdated`.
    pub async fn apply_pending_config(&self) -> Result<(), shared::FailureKind> {
        let pending = self.config_delivery.get_pending_config().await?;
        let payload = ConfigUpdatePayload {
            country_codes: pending.country_codes,
            is_allowed_for_region: pending.is_allowed_for_region,
            range_file_path: pending.range_file_path.ok_or(shared::FailureKind::InvalidS2File)?,
        };
        self.config_store
            .apply_config_update(payload)
            .map_err(Into::into)?;
        self.orchestrator.notify_config_updated().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::rangefile::test_support::write_range_file;
    use configstore::OverlayConfig;
    use orchestrator::default_controller_factory;
    use shared::deps::fakes::{
        FakeConfigDelivery, FakeCountryDetector, FakeEmergencyOracle, FakeLocationProvider,
        FakeSatelliteStatus,
    };
    use shared::telemetry::fakes::RecordingAnomalyReporter;
    use shared::{deps::PendingConfigPayload, FakeClock};

    fn overlay() -> OverlayConfig {
        OverlayConfig {
            country_codes: vec![CountryCode::parse("US").unwrap()],
            mode: Mode::AllowList,
            range_file_path: None,
            location_fresh_duration: Duration::from_secs(600),
        }
    }

    fn deps() -> OrchestratorDeps {
        OrchestratorDeps {
            location_provider: Arc::new(FakeLocationProvider::new()),
            country_detector: Arc::new(FakeCountryDetector::new()),
            satellite_status: Arc::new(FakeSatelliteStatus::new()),
            emergency_oracle: Arc::new(FakeEmergencyOracle::new()),
            anomaly_reporter: Arc::new(RecordingAnomalyReporter::new()),
            clock: Arc::new(FakeClock::new(1_000_000_000_000)),
            controller_factory: default_controller_factory(),
        }
    }

    #[tokio::test]
    async fn disabled_feature_flag_rejects_without_reaching_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let config_store =
            Arc::new(ConfigStore::load(overlay(), dir.path().join("private")).unwrap());
        let config_delivery = Arc::new(FakeConfigDelivery::new());
        let satlink = Satlink::new(deps(), config_store, config_delivery);
        satlink.set_feature_enabled(false);

        let reply = satlink.request_is_allowed(1).await;
        assert_eq!(reply.code, ResultCode::RequestNotSupported);
        assert_eq!(reply.allowed, None);
    }

    #[tokio::test]
    async fn test_override_requires_mock_modem_allowed_property() {
        let dir = tempfile::tempdir().unwrap();
        let config_store =
            Arc::new(ConfigStore::load(overlay(), dir.path().join("private")).unwrap());
        let config_delivery = Arc::new(FakeConfigDelivery::new());
        let satlink = Satlink::new(deps(), config_store, config_delivery);

        let accepted = satlink.set_test_override(TestOverrideRequest {
            reset: false,
            is_allow_list: false,
            range_file_path: None,
            location_fresh_duration_ns: 1,
            country_codes: vec!["JP".to_string()],
        });
        assert!(!accepted);

        satlink.set_mock_modem_allowed_property(true);
        let accepted = satlink.set_test_override(TestOverrideRequest {
            reset: false,
            is_allow_list: false,
            range_file_path: None,
            location_fresh_duration_ns: 1,
            country_codes: vec!["JP".to_string()],
        });
        assert!(accepted);
    }

    #[tokio::test]
    async fn apply_pending_config_adopts_a_valid_payload_and_notifies_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let config_store =
            Arc::new(ConfigStore::load(overlay(), dir.path().join("private")).unwrap());
        let config_delivery = Arc::new(FakeConfigDelivery::new());

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);
        config_delivery.set_pending(Some(PendingConfigPayload {
            country_codes: vec!["FR".to_string()],
            is_allowed_for_region: Some(true),
            range_file_path: Some(range_path),
        }));

        let satlink = Satlink::new(deps(), config_store.clone(), config_delivery);
        satlink.apply_pending_config().await.unwrap();

        let snapshot = config_store.active_snapshot();
        assert!(snapshot.is_country_in_list(&CountryCode::parse("FR").unwrap()));
    }

    #[tokio::test]
    async fn apply_pending_config_rejects_invalid_country_code() {
        let dir = tempfile::tempdir().unwrap();
        let config_store =
            Arc::new(ConfigStore::load(overlay(), dir.path().join("private")).unwrap());
        let config_delivery = Arc::new(FakeConfigDelivery::new());

        let range_path = dir.path().join("updater_ranges.bin");
        write_range_file(&range_path, 12, Mode::AllowList, &[(10, 20)]);
        config_delivery.set_pending(Some(PendingConfigPayload {
            country_codes: vec!["USA".to_string()],
            is_allowed_for_region: Some(true),
            range_file_path: Some(range_path),
        }));

        let satlink = Satlink::new(deps(), config_store.clone(), config_delivery);
        let result = satlink.apply_pending_config().await;
        assert!(result.is_err());
        assert_eq!(config_store.active_snapshot().overlay_source, configstore::OverlaySource::Overlay);
    }
}
