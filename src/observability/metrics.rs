use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub bookings_created_total: IntCounter,
    pub transitions_total: IntCounterVec,
    pub overdue_flagged_total: IntCounter,
    pub sweep_duration_seconds: Histogram,
    pub estimator_fallbacks_total: IntCounter,
    pub notification_subscribers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let bookings_created_total = IntCounter::new(
            "bookings_created_total",
            "Total bookings accepted into the ledger",
        )
        .expect("valid bookings_created_total metric");

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid transitions_total metric");

        let overdue_flagged_total = IntCounter::new(
            "overdue_flagged_total",
            "Bookings flagged overdue by the monitor",
        )
        .expect("valid overdue_flagged_total metric");

        let sweep_duration_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "sweep_duration_seconds",
            "Duration of a full overdue sweep in seconds",
        ))
        .expect("valid sweep_duration_seconds metric");

        let estimator_fallbacks_total = IntCounter::new(
            "estimator_fallbacks_total",
            "Estimates served by the static heuristic after upstream failure",
        )
        .expect("valid estimator_fallbacks_total metric");

        let notification_subscribers = IntGauge::new(
            "notification_subscribers",
            "Currently connected notification stream clients",
        )
        .expect("valid notification_subscribers metric");

        registry
            .register(Box::new(bookings_created_total.clone()))
            .expect("register bookings_created_total");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(overdue_flagged_total.clone()))
            .expect("register overdue_flagged_total");
        registry
            .register(Box::new(sweep_duration_seconds.clone()))
            .expect("register sweep_duration_seconds");
        registry
            .register(Box::new(estimator_fallbacks_total.clone()))
            .expect("register estimator_fallbacks_total");
        registry
            .register(Box::new(notification_subscribers.clone()))
            .expect("register notification_subscribers");

        Self {
            registry,
            bookings_created_total,
            transitions_total,
            overdue_flagged_total,
            sweep_duration_seconds,
            estimator_fallbacks_total,
            notification_subscribers,
        }
    }

    pub fn record_transition(&self, operation: &str, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        self.transitions_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
