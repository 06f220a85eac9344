use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{event, Level};

// instrumentation hook handed to the placement workflow at construction
pub trait WorkflowInstrumentation: Send + Sync {
    fn inventory_lookup_started(&self, order_id: &str, product_codes: &[String]);
    fn inventory_lookup_completed(&self, order_id: &str, statuses_returned: usize, elapsed: Duration);
    fn inventory_lookup_failed(&self, order_id: &str, error: &str, elapsed: Duration);
    fn order_placed(&self, order_id: &str);
    fn order_rejected(&self, reason: &'static str);
    fn publish_failed(&self, order_id: &str);
}

pub struct PrometheusWorkflowInstrumentation {
    registry: Registry,
    orders_placed: IntCounter,
    orders_rejected: IntCounterVec,
    publish_failures: IntCounter,
    inventory_lookup_seconds: Histogram,
    inventory_lookup_failures: IntCounter,
}

impl PrometheusWorkflowInstrumentation {
    pub fn new() -> Result<PrometheusWorkflowInstrumentation, String> {
        let registry = Registry::new();

        let orders_placed = match IntCounter::with_opts(Opts::new("orders_placed_total", "Orders persisted and announced on the placed topic")) {
            Ok(counter) => counter,
            Err(e) => return Err(format!("Failed to create orders_placed_total: {}", e))
        };
        let orders_rejected = match IntCounterVec::new(Opts::new("orders_rejected_total", "Placement attempts that ended without a persisted order"), &["reason"]) {
            Ok(counter) => counter,
            Err(e) => return Err(format!("Failed to create orders_rejected_total: {}", e))
        };
        let publish_failures = match IntCounter::with_opts(Opts::new("order_publish_failures_total", "Orders persisted whose placed event was not accepted by the broker")) {
            Ok(counter) => counter,
            Err(e) => return Err(format!("Failed to create order_publish_failures_total: {}", e))
        };
        let inventory_lookup_seconds = match Histogram::with_opts(HistogramOpts::new("inventory_lookup_duration_seconds", "Time spent waiting on the inventory service")) {
            Ok(histogram) => histogram,
            Err(e) => return Err(format!("Failed to create inventory_lookup_duration_seconds: {}", e))
        };
        let inventory_lookup_failures = match IntCounter::with_opts(Opts::new("inventory_lookup_failures_total", "Inventory lookups that failed after exhausting the retry budget")) {
            Ok(counter) => counter,
            Err(e) => return Err(format!("Failed to create inventory_lookup_failures_total: {}", e))
        };

        match registry.register(Box::new(orders_placed.clone())) {
            Ok(()) => {},
            Err(e) => return Err(format!("Failed to register orders_placed_total: {}", e))
        }
        match registry.register(Box::new(orders_rejected.clone())) {
            Ok(()) => {},
            Err(e) => return Err(format!("Failed to register orders_rejected_total: {}", e))
        }
        match registry.register(Box::new(publish_failures.clone())) {
            Ok(()) => {},
            Err(e) => return Err(format!("Failed to register order_publish_failures_total: {}", e))
        }
        match registry.register(Box::new(inventory_lookup_seconds.clone())) {
            Ok(()) => {},
            Err(e) => return Err(format!("Failed to register inventory_lookup_duration_seconds: {}", e))
        }
        match registry.register(Box::new(inventory_lookup_failures.clone())) {
            Ok(()) => {},
            Err(e) => return Err(format!("Failed to register inventory_lookup_failures_total: {}", e))
        }

        Ok(PrometheusWorkflowInstrumentation {
            registry: registry,
            orders_placed: orders_placed,
            orders_rejected: orders_rejected,
            publish_failures: publish_failures,
            inventory_lookup_seconds: inventory_lookup_seconds,
            inventory_lookup_failures: inventory_lookup_failures,
        })
    }

    pub fn render(&self) -> String {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        match encoder.encode(&metric_families, &mut buffer) {
            Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
            Err(e) => {
                event!(Level::WARN, "Error occurred while encoding workflow metrics: {}", e);
                String::new()
            }
        }
    }
}

impl WorkflowInstrumentation for PrometheusWorkflowInstrumentation {
    fn inventory_lookup_started(&self, order_id: &str, product_codes: &[String]) {
        event!(Level::INFO, order_id = order_id, "Calling inventory service for {:?}", product_codes);
    }

    fn inventory_lookup_completed(&self, order_id: &str, statuses_returned: usize, elapsed: Duration) {
        self.inventory_lookup_seconds.observe(elapsed.as_secs_f64());
        event!(Level::INFO, order_id = order_id, "Inventory service answered with {} statuses in {:?}", statuses_returned, elapsed);
    }

    fn inventory_lookup_failed(&self, order_id: &str, error: &str, elapsed: Duration) {
        self.inventory_lookup_seconds.observe(elapsed.as_secs_f64());
        self.inventory_lookup_failures.inc();
        event!(Level::WARN, order_id = order_id, "Inventory lookup failed after {:?}: {}", elapsed, error);
    }

    fn order_placed(&self, order_id: &str) {
        self.orders_placed.inc();
        event!(Level::INFO, order_id = order_id, "Order placed");
    }

    fn order_rejected(&self, reason: &'static str) {
        self.orders_rejected.with_label_values(&[reason]).inc();
    }

    fn publish_failed(&self, order_id: &str) {
        self.publish_failures.inc();
        event!(Level::WARN, order_id = order_id, "Order persisted but event publish failed");
    }
}
