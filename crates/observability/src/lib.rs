use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct TurnMetrics {
    turns_total: AtomicU64,
    completed_total: AtomicU64,
    recovered_total: AtomicU64,
    failed_total: AtomicU64,
    tool_calls_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub turns_total: u64,
    pub completed_total: u64,
    pub recovered_total: u64,
    pub failed_total: u64,
    pub tool_calls_total: u64,
    pub avg_latency_millis: f64,
}

impl TurnMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.completed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A parse failure whose payload was salvaged by the sanitizer.
    pub fn inc_recovered(&self) {
        self.recovered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tool_calls(&self, calls: usize) {
        self.tool_calls_total
            .fetch_add(calls as u64, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let turns = self.turns_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            turns_total: turns,
            completed_total: self.completed_total.load(Ordering::Relaxed),
            recovered_total: self.recovered_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            tool_calls_total: self.tool_calls_total.load(Ordering::Relaxed),
            avg_latency_millis: if turns == 0 {
                0.0
            } else {
                latency as f64 / turns as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,tripmate_agents=info,tripmate_tools=info,tripmate_core=warn",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
