use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Process-wide metrics registry, exported in Prometheus plaintext format at
/// `GET /metrics`. Constructed once at startup and cloned (cheaply, via `Arc`
/// internals on the prometheus collectors) into every component that reports
/// against it.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    orchestration_duration_seconds: HistogramVec,
    orchestration_memory_bytes: IntGaugeVec,
    orchestration_errors_total: IntCounterVec,
    cache_hits_total: IntCounterVec,
    cache_misses_total: IntCounterVec,
    admission_queue_length: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orchestration_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "orchestration_duration_seconds",
                "End-to-end orchestration run duration in seconds",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0]),
            &["status"],
        )
        .expect("valid histogram opts");

        let orchestration_memory_bytes = IntGaugeVec::new(
            Opts::new(
                "orchestration_memory_bytes",
                "Process-resident memory sampled before each agent runs",
            ),
            &["agent_name"],
        )
        .expect("valid gauge opts");

        let orchestration_errors_total = IntCounterVec::new(
            Opts::new("orchestration_errors_total", "Errors raised during orchestration"),
            &["error_type", "agent_name"],
        )
        .expect("valid counter opts");

        let cache_hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Cache hits by cache name"),
            &["cache_name"],
        )
        .expect("valid counter opts");

        let cache_misses_total = IntCounterVec::new(
            Opts::new("cache_misses_total", "Cache misses by cache name"),
            &["cache_name"],
        )
        .expect("valid counter opts");

        let admission_queue_length = IntGaugeVec::new(
            Opts::new("admission_queue_length", "Runs currently holding an admission ticket"),
            &["pool"],
        )
        .expect("valid gauge opts");

        for collector in [
            Box::new(orchestration_duration_seconds.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(orchestration_memory_bytes.clone()),
            Box::new(orchestration_errors_total.clone()),
            Box::new(cache_hits_total.clone()),
            Box::new(cache_misses_total.clone()),
            Box::new(admission_queue_length.clone()),
        ] {
            registry.register(collector).expect("metric registration does not collide");
        }

        Self {
            registry,
            orchestration_duration_seconds,
            orchestration_memory_bytes,
            orchestration_errors_total,
            cache_hits_total,
            cache_misses_total,
            admission_queue_length,
        }
    }

    pub fn record_run_duration(&self, status: &str, seconds: f64) {
        self.orchestration_duration_seconds
            .with_label_values(&[status])
            .observe(seconds);
    }

    pub fn set_agent_memory_bytes(&self, agent_name: &str, bytes: i64) {
        self.orchestration_memory_bytes
            .with_label_values(&[agent_name])
            .set(bytes);
    }

    pub fn record_error(&self, error_type: &str, agent_name: &str) {
        self.orchestration_errors_total
            .with_label_values(&[error_type, agent_name])
            .inc();
    }

    pub fn record_cache_hit(&self, cache_name: &str) {
        self.cache_hits_total.with_label_values(&[cache_name]).inc();
    }

    pub fn record_cache_miss(&self, cache_name: &str) {
        self.cache_misses_total.with_label_values(&[cache_name]).inc();
    }

    pub fn set_admission_queue_length(&self, in_use: i64) {
        self.admission_queue_length.with_label_values(&["default"]).set(in_use);
    }

    /// Hit rate for one named cache, `hits / (hits + misses)`. Returns `0.0`
    /// when the cache has never been queried, rather than dividing by zero.
    pub fn cache_hit_rate(&self, cache_name: &str) -> f64 {
        let hits = self.cache_hits_total.with_label_values(&[cache_name]).get() as f64;
        let misses = self.cache_misses_total.with_label_values(&[cache_name]).get() as f64;
        let total = hits + misses;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Renders every registered collector in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families)
    }

    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::new()
    }

    #[cfg(test)]
    pub fn cache_hits_for_test(&self, cache_name: &str) -> i64 {
        self.cache_hits_total.with_label_values(&[cache_name]).get() as i64
    }

    #[cfg(test)]
    pub fn cache_misses_for_test(&self, cache_name: &str) -> i64 {
        self.cache_misses_total.with_label_values(&[cache_name]).get() as i64
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
