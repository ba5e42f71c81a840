//! Capability traits for the platform collaborators the orchestrator drives.
//!
//! Each of these is genuinely out of scope for this workspace (telephony
//! framework, GPS stack, config-delivery channel...); what lives here is
//! only the interface the orchestrator drives them through, plus fakes
//! for tests.

use crate::types::CountryCode;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Opaque identifier for a telephony subscription. The real type in the
/// outer telephony service is richer; the core only ever threads it
/// through to replies and external queries.
pub type SubId = i64;

/// A location fix as reported by the platform's location stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// How long ago this fix was obtained.
    pub age: Duration,
    /// Whether this fix came from a mock location provider (e.g. a test
    /// harness or a developer setting), relevant to the orchestrator's
    /// mock-modem acceptance policy.
    pub is_mock: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationQuality {
    High,
}

#[derive(Clone, Copy, Debug)]
pub struct LocationRequest {
    pub quality: LocationQuality,
    pub ignore_settings: bool,
}

/// Handle to an in-flight asynchronous location query, returned by
/// `LocationProvider::current`. Dropping it without calling `cancel`
/// leaves the query running; `cancel` is idempotent.
pub struct LocationQueryHandle {
    cancel_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl LocationQueryHandle {
    pub fn new(cancel_tx: tokio::sync::oneshot::Sender<()>) -> Self {
        LocationQueryHandle {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// A handle for providers that don't support cancellation (e.g. fakes
    /// that already resolved synchronously).
    pub fn inert() -> Self {
        LocationQueryHandle { cancel_tx: None }
    }

    pub fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// The most recent location fix the platform already has cached, if
    /// any, regardless of age.
    async fn last_known(&self) -> Option<Location>;

    /// Starts an asynchronous location query. The result (`Some` on a fix,
    /// `None` if the provider gives up) is delivered on `reply` exactly
    /// once. Returns a handle the caller can use to cancel the query.
    async fn current(
        &self,
        request: LocationRequest,
        reply: tokio::sync::oneshot::Sender<Option<Location>>,
    ) -> LocationQueryHandle;
}

#[async_trait::async_trait]
pub trait CountryDetector: Send + Sync {
    /// Country codes derived from the current network (e.g. camped-on
    /// cell MCCs). Empty when no network signal is available.
    async fn current_network_cc_list(&self) -> Vec<CountryCode>;

    /// The most recently cached location-derived country code, with the
    /// instant it was recorded.
    async fn cached_location_cc_with_time(&self) -> (Option<CountryCode>, Option<Instant>);

    /// Per-network-country timestamps of when each was last observed.
    async fn cached_network_cc_history(&self) -> HashMap<CountryCode, Instant>;
}

/// `{code, bool}` reply shape for the satellite-supported/provisioned
/// queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoolStatus {
    pub code: crate::types::ResultCode,
    pub value: bool,
}

impl BoolStatus {
    pub fn ok(value: bool) -> Self {
        BoolStatus {
            code: crate::types::ResultCode::Ok,
            value,
        }
    }
}

#[async_trait::async_trait]
pub trait SatelliteStatus: Send + Sync {
    async fn is_supported(&self, sub_id: SubId) -> BoolStatus;
    async fn is_provisioned(&self, sub_id: SubId) -> BoolStatus;
}

pub trait EmergencyOracle: Send + Sync {
    fn is_in_emergency(&self) -> bool;
}

/// The config-updater payload as handed over by the delivery channel,
/// before `configstore` validates it.
#[derive(Clone, Debug)]
pub struct PendingConfigPayload {
    pub country_codes: Vec<String>,
    pub is_allowed_for_region: Option<bool>,
    pub range_file_path: Option<PathBuf>,
}

#[async_trait::async_trait]
pub trait ConfigDelivery: Send + Sync {
    /// Fetches whatever config-updater payload is currently pending.
    /// `ConfigUpdated` notifications themselves are delivered to the
    /// orchestrator out-of-band (it is, after all, a message-driven state
    /// machine) — this method is how the core pulls the payload once it
    /// decides to act on that notification.
    async fn get_pending_config(&self) -> Result<PendingConfigPayload, crate::FailureKind>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fakes {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[derive(Default)]
    pub struct FakeLocationProvider {
        pub last_known: Mutex<Option<Location>>,
        /// Queued results handed out in order to successive `current` calls.
        pub queued_results: Mutex<Vec<Option<Location>>>,
        /// Reply senders for calls with no queued result, kept alive so the
        /// receiver hangs (simulating a query that never completes) rather
        /// than observing a dropped-sender error.
        stalled_senders: Mutex<Vec<oneshot::Sender<Option<Location>>>>,
    }

    impl FakeLocationProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_last_known(&self, loc: Option<Location>) {
            *self.last_known.lock().unwrap() = loc;
        }

        pub fn queue_result(&self, loc: Option<Location>) {
            self.queued_results.lock().unwrap().push(loc);
        }
    }

    #[async_trait::async_trait]
    impl LocationProvider for FakeLocationProvider {
        async fn last_known(&self) -> Option<Location> {
            *self.last_known.lock().unwrap()
        }

        async fn current(
            &self,
            _request: LocationRequest,
            reply: oneshot::Sender<Option<Location>>,
        ) -> LocationQueryHandle {
            let queued = self.queued_results.lock().unwrap().pop();
            match queued {
                Some(result) => {
                    let _ = reply.send(result);
                    LocationQueryHandle::inert()
                }
                None => {
                    // No queued result: simulate a provider that never
                    // replies, so timeout-path tests can exercise
                    // `LocationTimeout` and cancellation.
                    let (cancel_tx, _cancel_rx) = oneshot::channel();
                    self.stalled_senders.lock().unwrap().push(reply);
                    LocationQueryHandle::new(cancel_tx)
                }
            }
        }
    }

    #[derive(Default)]
    pub struct FakeCountryDetector {
        pub network_cc_list: Mutex<Vec<CountryCode>>,
        pub cached_location_cc: Mutex<(Option<CountryCode>, Option<Instant>)>,
        pub network_cc_history: Mutex<HashMap<CountryCode, Instant>>,
    }

    impl FakeCountryDetector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_network_cc_list(&self, codes: Vec<CountryCode>) {
            *self.network_cc_list.lock().unwrap() = codes;
        }

        pub fn set_cached_location_cc(&self, cc: Option<CountryCode>, at: Option<Instant>) {
            *self.cached_location_cc.lock().unwrap() = (cc, at);
        }

        pub fn set_network_cc_history(&self, history: HashMap<CountryCode, Instant>) {
            *self.network_cc_history.lock().unwrap() = history;
        }
    }

    #[async_trait::async_trait]
    impl CountryDetector for FakeCountryDetector {
        async fn current_network_cc_list(&self) -> Vec<CountryCode> {
            self.network_cc_list.lock().unwrap().clone()
        }

        async fn cached_location_cc_with_time(&self) -> (Option<CountryCode>, Option<Instant>) {
            self.cached_location_cc.lock().unwrap().clone()
        }

        async fn cached_network_cc_history(&self) -> HashMap<CountryCode, Instant> {
            self.network_cc_history.lock().unwrap().clone()
        }
    }

    pub struct FakeSatelliteStatus {
        pub supported: Mutex<BoolStatus>,
        pub provisioned: Mutex<BoolStatus>,
    }

    impl Default for FakeSatelliteStatus {
        fn default() -> Self {
            FakeSatelliteStatus {
                supported: Mutex::new(BoolStatus::ok(true)),
                provisioned: Mutex::new(BoolStatus::ok(true)),
            }
        }
    }

    impl FakeSatelliteStatus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_supported(&self, status: BoolStatus) {
            *self.supported.lock().unwrap() = status;
        }

        pub fn set_provisioned(&self, status: BoolStatus) {
            *self.provisioned.lock().unwrap() = status;
        }
    }

    #[async_trait::async_trait]
    impl SatelliteStatus for FakeSatelliteStatus {
        async fn is_supported(&self, _sub_id: SubId) -> BoolStatus {
            *self.supported.lock().unwrap()
        }

        async fn is_provisioned(&self, _sub_id: SubId) -> BoolStatus {
            *self.provisioned.lock().unwrap()
        }
    }

    pub struct FakeEmergencyOracle {
        pub in_emergency: std::sync::atomic::AtomicBool,
    }

    impl Default for FakeEmergencyOracle {
        fn default() -> Self {
            FakeEmergencyOracle {
                in_emergency: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    impl FakeEmergencyOracle {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, value: bool) {
            self.in_emergency
                .store(value, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl EmergencyOracle for FakeEmergencyOracle {
        fn is_in_emergency(&self) -> bool {
            self.in_emergency.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    pub struct FakeConfigDelivery {
        pub pending: Mutex<Option<PendingConfigPayload>>,
    }

    impl FakeConfigDelivery {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_pending(&self, payload: Option<PendingConfigPayload>) {
            *self.pending.lock().unwrap() = payload;
        }
    }

    #[async_trait::async_trait]
    impl ConfigDelivery for FakeConfigDelivery {
        async fn get_pending_config(&self) -> Result<PendingConfigPayload, crate::FailureKind> {
            self.pending
                .lock()
                .unwrap()
                .clone()
                .ok_or(crate::FailureKind::NoPendingConfig)
        }
    }
}
