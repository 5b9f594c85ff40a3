//! # Server Metrics
//!
//! Per-command counters and latency accumulators, grounded on
//! [`goodies_engine::CommandProcessor`]'s dispatch table. A cache server's
//! operator wants to know which *command* is slow or failing (`ListPush`
//! versus `Get`), not a single blended latency distribution across every
//! request — so each known command name gets its own running accumulator
//! instead of one generic histogram.
//!
//! ## Design Principles
//! 1. **Fixed Label Set**: Commands are a closed set (the same one
//!    [`CommandProcessor`](goodies_engine::CommandProcessor) dispatches
//!    against), so the label table is built once and never grows; a request
//!    naming anything outside that set — an unrecognized command or a frame
//!    that never deserialized into a command at all — folds into a single
//!    `unknown` slot rather than letting an adversarial client mint unbounded
//!    labels.
//! 2. **Accumulator Pattern**: Atomic counters aggregate events cheaply.
//! 3. **Zero-Cost Access**: Snapshots are plain structs without heap work
//!    beyond the label strings themselves.
//!
//! Metrics are intentionally decoupled from the request path; transports
//! call `record_*` around dispatch, nothing in `goodies-engine` knows this
//! type exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Command names tracked individually. Must match
/// [`CommandProcessor`](goodies_engine::CommandProcessor)'s handler table.
pub const KNOWN_COMMANDS: [&str; 15] = [
    "Set",
    "Get",
    "Update",
    "Remove",
    "Keys",
    "ListPush",
    "ListLen",
    "ListGetByIndex",
    "ListRemoveIndex",
    "ListRemoveValue",
    "DictSet",
    "DictGet",
    "DictRemove",
    "DictHasKey",
    "SetExpiry",
];

/// Label for requests that don't name a known command: malformed frames that
/// never reached dispatch, and command names the processor doesn't recognize.
const UNKNOWN_LABEL: &str = "unknown";

/// Running counters for a single command label.
#[derive(Default)]
struct CommandStats {
    requests: AtomicU64,
    errors: AtomicU64,
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

impl CommandStats {
    fn record(&self, latency: Duration, success: bool) {
        let micros = latency.as_micros() as u64;
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
        self.max_latency_us.fetch_max(micros, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self, name: &'static str) -> CommandSnapshot {
        CommandSnapshot {
            name,
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_latency_us: self.total_latency_us.load(Ordering::Relaxed),
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters for one command label.
#[derive(Debug, Clone)]
pub struct CommandSnapshot {
    pub name: &'static str,
    pub requests: u64,
    pub errors: u64,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

/// Snapshot of all server metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Requests accepted but not yet dispatched to completion.
    pub inflight: u64,
    /// Per-command counters, in [`KNOWN_COMMANDS`] order plus the trailing
    /// `unknown` label.
    pub commands: Vec<CommandSnapshot>,
}

impl MetricsSnapshot {
    /// Total requests observed across every command label.
    pub fn requests_total(&self) -> u64 {
        self.commands.iter().map(|c| c.requests).sum()
    }

    /// Total error responses observed across every command label.
    pub fn errors_total(&self) -> u64 {
        self.commands.iter().map(|c| c.errors).sum()
    }
}

/// Thread-safe metrics aggregator shared by the HTTP and TCP transports.
///
/// `Ordering::Relaxed` is sufficient throughout: counters don't need to be
/// observed together, only eventually consistent.
pub struct Metrics {
    inflight: AtomicU64,
    labels: Vec<&'static str>,
    stats: Vec<CommandStats>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut labels: Vec<&'static str> = KNOWN_COMMANDS.to_vec();
        labels.push(UNKNOWN_LABEL);
        let stats = labels.iter().map(|_| CommandStats::default()).collect();
        Metrics {
            inflight: AtomicU64::new(0),
            labels,
            stats,
        }
    }

    /// Records the start of a request: call when a request is accepted, before dispatch.
    pub fn record_request_start(&self) {
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the end of a request against its command label, falling back
    /// to the `unknown` slot for names outside [`KNOWN_COMMANDS`].
    pub fn record_command(&self, command: &str, latency: Duration, success: bool) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        let idx = self
            .labels
            .iter()
            .position(|label| *label == command)
            .unwrap_or(self.labels.len() - 1);
        self.stats[idx].record(latency, success);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let commands = self
            .labels
            .iter()
            .zip(self.stats.iter())
            .map(|(name, stats)| stats.snapshot(name))
            .collect();
        MetricsSnapshot {
            inflight: self.inflight.load(Ordering::Relaxed),
            commands,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_request_lifecycle() {
        let m = Metrics::new();
        m.record_request_start();
        m.record_command("Get", Duration::from_micros(3), true);
        let snap = m.snapshot();
        assert_eq!(snap.requests_total(), 1);
        assert_eq!(snap.errors_total(), 0);
        assert_eq!(snap.inflight, 0);
    }

    #[test]
    fn counts_errors_separately_per_command() {
        let m = Metrics::new();
        m.record_request_start();
        m.record_command("Get", Duration::from_micros(1), false);
        m.record_request_start();
        m.record_command("Set", Duration::from_micros(1), true);

        let snap = m.snapshot();
        assert_eq!(snap.errors_total(), 1);
        let get = snap.commands.iter().find(|c| c.name == "Get").unwrap();
        assert_eq!(get.errors, 1);
        let set = snap.commands.iter().find(|c| c.name == "Set").unwrap();
        assert_eq!(set.errors, 0);
    }

    #[test]
    fn unrecognized_command_names_fold_into_unknown() {
        let m = Metrics::new();
        m.record_request_start();
        m.record_command("Frobnicate", Duration::from_micros(1), false);
        m.record_request_start();
        m.record_command("malformed", Duration::from_micros(1), false);

        let snap = m.snapshot();
        let unknown = snap.commands.iter().find(|c| c.name == UNKNOWN_LABEL).unwrap();
        assert_eq!(unknown.requests, 2);
        assert_eq!(unknown.errors, 2);
    }

    #[test]
    fn tracks_max_latency_per_command() {
        let m = Metrics::new();
        m.record_request_start();
        m.record_command("Get", Duration::from_micros(5), true);
        m.record_request_start();
        m.record_command("Get", Duration::from_micros(50), true);

        let snap = m.snapshot();
        let get = snap.commands.iter().find(|c| c.name == "Get").unwrap();
        assert_eq!(get.max_latency_us, 50);
        assert_eq!(get.total_latency_us, 55);
    }
}
