use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    rule_matches_total: AtomicU64,
    fallback_attempts_total: AtomicU64,
    fallback_answers_total: AtomicU64,
    fallback_failures_total: AtomicU64,
    unknown_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub rule_matches_total: u64,
    pub fallback_attempts_total: u64,
    pub fallback_answers_total: u64,
    pub fallback_failures_total: u64,
    pub unknown_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rule_match(&self) {
        self.rule_matches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_attempt(&self) {
        self.fallback_attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_answer(&self) {
        self.fallback_answers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_failure(&self) {
        self.fallback_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown(&self) {
        self.unknown_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            rule_matches_total: self.rule_matches_total.load(Ordering::Relaxed),
            fallback_attempts_total: self.fallback_attempts_total.load(Ordering::Relaxed),
            fallback_answers_total: self.fallback_answers_total.load(Ordering::Relaxed),
            fallback_failures_total: self.fallback_failures_total.load(Ordering::Relaxed),
            unknown_total: self.unknown_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,ferro_api=info,ferro_core=info,ferro_ml=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
