//! Types, error taxonomy, and external-collaborator traits shared by the
//! rest of the workspace.
//!
//! Nothing in this crate talks to the filesystem, the network, or a real
//! clock source beyond `std`/`tokio` primitives — it exists so `access`,
//! `configstore`, `orchestrator`, and `satlink` agree on vocabulary
//! without depending on each other directly.

pub mod clock;
pub mod deps;
pub mod errors;
pub mod telemetry;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use deps::{
    ConfigDelivery, CountryDetector, EmergencyOracle, Location, LocationProvider,
    PendingConfigPayload, SatelliteStatus,
};
pub use errors::FailureKind;
pub use telemetry::AnomalyReporter;
pub use types::{CountryCode, Mode, RegistrationCode, ResultCode};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
