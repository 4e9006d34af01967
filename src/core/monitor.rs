use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Request failure categories counted by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SchemaMismatch,
    Unauthorized,
    ExplanationFailed,
    Internal,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::SchemaMismatch,
        ErrorKind::Unauthorized,
        ErrorKind::ExplanationFailed,
        ErrorKind::Internal,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ExplanationFailed => "explanation_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Host resource utilization, sampled outside this crate's core
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub resident_memory_bytes: Option<u64>,
    pub memory_utilization: Option<f64>,
    pub load_average_1m: Option<f64>,
}

/// Point-in-time read of the monitor counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub successes: u64,
    pub total_errors: u64,
    pub rate_limited: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub max_latency_ms: f64,
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
    pub resources: ResourceUsage,
}

/// Process-wide request counters
///
/// Additive only; there is no reset short of constructing a new monitor.
#[derive(Debug)]
pub struct Monitor {
    started: Instant,
    started_at: DateTime<Utc>,
    successes: AtomicU64,
    errors: [AtomicU64; 4],
    rate_limited: AtomicU64,
    latency_total_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            successes: AtomicU64::new(0),
            errors: Default::default(),
            rate_limited: AtomicU64::new(0),
            latency_total_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.latency_total_us.fetch_add(micros, Ordering::Relaxed);
        self.latency_max_us.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.errors[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Rate-limit rejections are an admission outcome, not an error
    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, resources: ResourceUsage) -> MetricsSnapshot {
        let successes = self.successes.load(Ordering::Relaxed);
        let errors_by_kind: BTreeMap<ErrorKind, u64> = ErrorKind::ALL
            .iter()
            .map(|&kind| (kind, self.errors[kind.index()].load(Ordering::Relaxed)))
            .collect();
        let total_errors: u64 = errors_by_kind.values().sum();
        let rate_limited = self.rate_limited.load(Ordering::Relaxed);
        let total_requests = successes + total_errors + rate_limited;

        let success_rate = if total_requests == 0 {
            1.0
        } else {
            successes as f64 / total_requests as f64
        };
        let average_latency_ms = if successes == 0 {
            0.0
        } else {
            self.latency_total_us.load(Ordering::Relaxed) as f64 / successes as f64 / 1000.0
        };

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            total_requests,
            successes,
            total_errors,
            rate_limited,
            success_rate,
            average_latency_ms,
            max_latency_ms: self.latency_max_us.load(Ordering::Relaxed) as f64 / 1000.0,
            errors_by_kind,
            resources,
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}
