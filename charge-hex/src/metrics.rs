//! Prometheus metrics for the charge path.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use charge_types::MinorUnits;

/// Metrics sink for charge outcomes.
///
/// Each instance owns its registry so tests and embedders never share
/// process-global state.
pub struct PaymentMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    transaction_amount_cents_total: IntCounterVec,
    errors_total: IntCounterVec,
    rate_limit_rejections_total: IntCounter,
}

impl Default for PaymentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("payment_requests_total", "Total number of payment requests"),
            &["status", "mode"],
        )
        .expect("metric creation should not fail");

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "payment_request_duration_seconds",
                "Duration of payment requests in seconds",
            ),
            &["status"],
        )
        .expect("metric creation should not fail");

        let transaction_amount_cents_total = IntCounterVec::new(
            Opts::new(
                "payment_transaction_amount_cents_total",
                "Total transaction amount in cents",
            ),
            &["mode"],
        )
        .expect("metric creation should not fail");

        let errors_total = IntCounterVec::new(
            Opts::new("payment_errors_total", "Total number of payment errors"),
            &["type"],
        )
        .expect("metric creation should not fail");

        let rate_limit_rejections_total = IntCounter::with_opts(Opts::new(
            "payment_rate_limit_rejections_total",
            "Total number of rate limit rejections",
        ))
        .expect("metric creation should not fail");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(transaction_amount_cents_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(rate_limit_rejections_total.clone()))
            .expect("registration should not fail");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            transaction_amount_cents_total,
            errors_total,
            rate_limit_rejections_total,
        }
    }

    /// Records a completed charge. Only positive successful amounts add to the total.
    pub fn record_request(&self, success: bool, mode: &str, latency: Duration, amount: MinorUnits) {
        let status = if success { "success" } else { "failure" };

        self.requests_total.with_label_values(&[status, mode]).inc();
        self.request_duration_seconds
            .with_label_values(&[status])
            .observe(latency.as_secs_f64());

        if success && amount > 0 {
            self.transaction_amount_cents_total
                .with_label_values(&[mode])
                .inc_by(amount.unsigned_abs());
        }
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total.with_label_values(&[error_type]).inc();
    }

    pub fn record_rejection(&self) {
        self.rate_limit_rejections_total.inc();
    }

    pub fn requests(&self, status: &str, mode: &str) -> u64 {
        self.requests_total.with_label_values(&[status, mode]).get()
    }

    pub fn amount_cents(&self, mode: &str) -> u64 {
        self.transaction_amount_cents_total
            .with_label_values(&[mode])
            .get()
    }

    pub fn errors(&self, error_type: &str) -> u64 {
        self.errors_total.with_label_values(&[error_type]).get()
    }

    pub fn rejections(&self) -> u64 {
        self.rate_limit_rejections_total.get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
