//! Anomaly reporting and metrics emission.
//!
//! The real sink (crash reporter, StatsD, whatever the platform operator
//! wires up) lives outside this workspace; this module gives every call
//! site in `access`/`configstore`/`orchestrator` a real trait to call
//! into instead of a bare log line, so the side effect survives as code
//! rather than being silently dropped.

use std::fmt;

/// A named, free-form anomaly report. `context` is a short list of
/// `(key, value)` pairs for structured logging, deliberately untyped
/// since anomaly shapes vary per call site.
#[derive(Debug, Clone)]
pub struct Anomaly {
    pub name: &'static str,
    pub context: Vec<(&'static str, String)>,
}

impl Anomaly {
    pub fn new(name: &'static str) -> Self {
        Anomaly {
            name,
            context: Vec::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.context.push((key, value.to_string()));
        self
    }
}

pub trait AnomalyReporter: Send + Sync {
    fn report(&self, anomaly: Anomaly);
}

/// Production implementation: logs via `tracing` and increments a metrics
/// counter keyed by anomaly name, mirroring how the system this core was
/// modeled on distinguishes "log for humans" from "count for alerting".
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAnomalyReporter;

impl AnomalyReporter for LoggingAnomalyReporter {
    fn report(&self, anomaly: Anomaly) {
        tracing::warn!(
            anomaly = anomaly.name,
            context = ?anomaly.context,
            "anomaly reported"
        );
        metrics::counter!("satlink.anomaly", "name" => anomaly.name).increment(1);
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Records every anomaly reported, for assertions in tests.
    #[derive(Default)]
    pub struct RecordingAnomalyReporter {
        reports: Mutex<Vec<Anomaly>>,
    }

    impl RecordingAnomalyReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.reports.lock().unwrap().iter().map(|a| a.name).collect()
        }
    }

    impl AnomalyReporter for RecordingAnomalyReporter {
        fn report(&self, anomaly: Anomaly) {
            self.reports.lock().unwrap().push(anomaly);
        }
    }
}
