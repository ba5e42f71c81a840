//! Configuration source arbitration and persistence.
//!
//! Selects between a built-in overlay dataset and a dynamically delivered
//! config-updater dataset, validates config-updater payloads, copies
//! their range file into a private directory, and persists the latest
//! verdict and chosen country list across restarts.

mod overlay;
mod persistence;
mod snapshot;
mod store;
mod validation;

pub use overlay::OverlayConfig;
pub use persistence::{CachedVerdictState, PersistedState};
pub use snapshot::{ConfigSnapshot, OverlaySource};
pub use store::{ConfigError, ConfigStore, TestOverride};
pub use validation::{ConfigUpdatePayload, ValidationError};
