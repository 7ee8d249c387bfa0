//! Prometheus metrics.
//!
//! All metrics live in one private registry. `register_metrics` is
//! idempotent; `gather_metrics` renders the Prometheus text format.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global registry for all node metrics
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER
    // =========================================================================

    pub static ref BLOCKS_APPENDED: Counter = Counter::new(
        "pm_ledger_blocks_appended_total",
        "Blocks appended to the ledger"
    ).expect("metric creation failed");

    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "pm_ledger_chain_height",
        "Index of the current chain head"
    ).expect("metric creation failed");

    pub static ref POW_EXHAUSTED: Counter = Counter::new(
        "pm_ledger_pow_exhausted_total",
        "Blocks appended without meeting the proof-of-work target"
    ).expect("metric creation failed");

    pub static ref POW_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pm_ledger_pow_duration_seconds",
            "Wall time spent searching for a nonce"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).expect("metric creation failed");

    // =========================================================================
    // MINING
    // =========================================================================

    pub static ref MINING_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("pm_mining_operations_total", "Mining operations by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    pub static ref ACTIVE_OPERATIONS: Gauge = Gauge::new(
        "pm_mining_active_operations",
        "Mining operations currently running"
    ).expect("metric creation failed");

    pub static ref WORK_VALUE: HistogramVec = HistogramVec::new(
        HistogramOpts::new("pm_mining_work_value", "Scientific value of emitted work items")
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
        &["work_type"]
    ).expect("metric creation failed");

    pub static ref NETWORK_HASHRATE: Gauge = Gauge::new(
        "pm_network_hashrate",
        "Aggregate hashrate reported by the last metrics snapshot"
    ).expect("metric creation failed");

    // =========================================================================
    // CONSENSUS
    // =========================================================================

    pub static ref VALIDATIONS_SUBMITTED: CounterVec = CounterVec::new(
        Opts::new("pm_consensus_validations_total", "Validator decisions recorded"),
        &["layer", "decision"]
    ).expect("metric creation failed");

    pub static ref CONSENSUS_ROUNDS: CounterVec = CounterVec::new(
        Opts::new("pm_consensus_rounds_total", "Consensus rounds by terminal outcome"),
        &["layer", "outcome"]
    ).expect("metric creation failed");

    pub static ref CONSENSUS_STALLS: CounterVec = CounterVec::new(
        Opts::new("pm_consensus_stalls_total", "Rounds that missed their collection window"),
        &["layer"]
    ).expect("metric creation failed");

    // =========================================================================
    // FINALITY AND RECORDS
    // =========================================================================

    pub static ref FINALITY_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("pm_finality_transitions_total", "Blocks entering each finality stage"),
        &["stage"]
    ).expect("metric creation failed");

    pub static ref CANONICAL_HEIGHT: Gauge = Gauge::new(
        "pm_finality_canonical_height",
        "Registered blocks that have not been rejected"
    ).expect("metric creation failed");

    pub static ref RECORDS_APPENDED: CounterVec = CounterVec::new(
        Opts::new("pm_records_appended_total", "Records appended per audit chain"),
        &["chain"]
    ).expect("metric creation failed");

    pub static ref CHAIN_HALTS: CounterVec = CounterVec::new(
        Opts::new("pm_chain_halts_total", "Halts of the ledger or an audit chain"),
        &["chain"]
    ).expect("metric creation failed");

    // =========================================================================
    // RUNTIME
    // =========================================================================

    pub static ref EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("pm_bus_events_total", "Events published on the bus"),
        &["kind"]
    ).expect("metric creation failed");

    pub static ref TASK_ERRORS: CounterVec = CounterVec::new(
        Opts::new("pm_task_errors_total", "Failed runs of scheduled tasks"),
        &["task"]
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`].
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BLOCKS_APPENDED.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(POW_EXHAUSTED.clone()),
        Box::new(POW_DURATION.clone()),
        Box::new(MINING_OPERATIONS.clone()),
        Box::new(ACTIVE_OPERATIONS.clone()),
        Box::new(WORK_VALUE.clone()),
        Box::new(NETWORK_HASHRATE.clone()),
        Box::new(VALIDATIONS_SUBMITTED.clone()),
        Box::new(CONSENSUS_ROUNDS.clone()),
        Box::new(CONSENSUS_STALLS.clone()),
        Box::new(FINALITY_TRANSITIONS.clone()),
        Box::new(CANONICAL_HEIGHT.clone()),
        Box::new(RECORDS_APPENDED.clone()),
        Box::new(CHAIN_HALTS.clone()),
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(TASK_ERRORS.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::Metrics(e.to_string())),
        }
    }
    Ok(())
}

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}

/// Observes elapsed time into a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }

    /// Stop early and return the elapsed seconds.
    pub fn stop(self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
