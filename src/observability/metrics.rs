// Pipeline metrics
//
// Counters for every terminal state, rejected and failed requests, plus a
// request latency histogram. Exported in Prometheus text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::types::{ExecutionResult, ExecutionStatus};

/// Count that only grows
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Level that follows work in flight
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    /// Increment now and decrement when the returned guard is dropped
    pub fn track(&self) -> GaugeGuard<'_> {
        self.inc();
        GaugeGuard(self)
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Holds one unit of a [`Gauge`] for as long as it lives
#[must_use]
pub struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Cumulative bucket; `le` is its upper bound in seconds
#[derive(Debug)]
pub struct HistogramBucket {
    pub le: f64,
    pub count: AtomicU64,
}

/// Request latency distribution
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Buckets spanning a fast run up to both deadlines back to back
    pub fn new_request_latency() -> Self {
        let buckets = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0]
            .into_iter()
            .map(|le| HistogramBucket {
                le,
                count: AtomicU64::new(0),
            })
            .collect();

        Self {
            buckets,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: Duration) {
        let seconds = value.as_secs_f64();
        self.sum_micros
            .fetch_add(value.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for bucket in &self.buckets {
            if seconds <= bucket.le {
                bucket.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_micros(&self) -> u64 {
        self.sum_micros.load(Ordering::Relaxed)
    }

    pub fn bucket_count(&self, le: f64) -> u64 {
        self.buckets
            .iter()
            .find(|b| (b.le - le).abs() < 0.0001)
            .map(|b| b.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Metrics for the execution service
#[derive(Debug)]
pub struct PipelineMetrics {
    pub requests_total: Counter,
    pub rejected_total: Counter,
    pub infrastructure_errors_total: Counter,
    pub executions_ok: Counter,
    pub executions_ce: Counter,
    pub executions_tle: Counter,
    pub executions_re: Counter,
    pub active_executions: Gauge,
    pub request_latency: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Counter::new(),
            rejected_total: Counter::new(),
            infrastructure_errors_total: Counter::new(),
            executions_ok: Counter::new(),
            executions_ce: Counter::new(),
            executions_tle: Counter::new(),
            executions_re: Counter::new(),
            active_executions: Gauge::new(),
            request_latency: Histogram::new_request_latency(),
        }
    }

    pub fn record_rejection(&self) {
        self.requests_total.inc();
        self.rejected_total.inc();
    }

    pub fn record_infrastructure_error(&self, latency: Duration) {
        self.requests_total.inc();
        self.infrastructure_errors_total.inc();
        self.request_latency.observe(latency);
    }

    pub fn record_result(&self, result: &ExecutionResult, latency: Duration) {
        self.requests_total.inc();
        self.request_latency.observe(latency);
        match result.status() {
            ExecutionStatus::Ok => self.executions_ok.inc(),
            ExecutionStatus::CompileError => self.executions_ce.inc(),
            ExecutionStatus::TimeLimit => self.executions_tle.inc(),
            ExecutionStatus::RuntimeError => self.executions_re.inc(),
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP execbox_requests_total Total number of run requests");
        let _ = writeln!(out, "# TYPE execbox_requests_total counter");
        let _ = writeln!(out, "execbox_requests_total {}", self.requests_total.get());

        let _ = writeln!(out, "# HELP execbox_rejected_total Requests rejected before the pipeline");
        let _ = writeln!(out, "# TYPE execbox_rejected_total counter");
        let _ = writeln!(out, "execbox_rejected_total {}", self.rejected_total.get());

        let _ = writeln!(
            out,
            "# HELP execbox_infrastructure_errors_total Requests failed by setup errors"
        );
        let _ = writeln!(out, "# TYPE execbox_infrastructure_errors_total counter");
        let _ = writeln!(
            out,
            "execbox_infrastructure_errors_total {}",
            self.infrastructure_errors_total.get()
        );

        let _ = writeln!(out, "# HELP execbox_executions_by_status Executions by terminal state");
        let _ = writeln!(out, "# TYPE execbox_executions_by_status counter");
        for (status, counter) in [
            (ExecutionStatus::Ok, &self.executions_ok),
            (ExecutionStatus::CompileError, &self.executions_ce),
            (ExecutionStatus::TimeLimit, &self.executions_tle),
            (ExecutionStatus::RuntimeError, &self.executions_re),
        ] {
            let _ = writeln!(
                out,
                "execbox_executions_by_status{{status=\"{}\"}} {}",
                status,
                counter.get()
            );
        }

        let _ = writeln!(out, "# HELP execbox_active_executions Pipelines currently running");
        let _ = writeln!(out, "# TYPE execbox_active_executions gauge");
        let _ = writeln!(out, "execbox_active_executions {}", self.active_executions.get());

        let _ = writeln!(out, "# HELP execbox_request_latency_seconds Pipeline latency");
        let _ = writeln!(out, "# TYPE execbox_request_latency_seconds histogram");
        for bucket in &self.request_latency.buckets {
            let _ = writeln!(
                out,
                "execbox_request_latency_seconds_bucket{{le=\"{}\"}} {}",
                bucket.le,
                bucket.count.load(Ordering::Relaxed)
            );
        }
        let _ = writeln!(
            out,
            "execbox_request_latency_seconds_bucket{{le=\"+Inf\"}} {}",
            self.request_latency.count()
        );
        let _ = writeln!(
            out,
            "execbox_request_latency_seconds_sum {}",
            self.request_latency.sum_micros() as f64 / 1_000_000.0
        );
        let _ = writeln!(
            out,
            "execbox_request_latency_seconds_count {}",
            self.request_latency.count()
        );

        out
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
