//! Prometheus metrics for the poll.
//!
//! [`PollMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct PollMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Votes admitted and persisted.
    pub votes_accepted: IntCounter,
    /// Vote attempts turned away, labelled by `reason`.
    pub votes_rejected: IntCounterVec,
    /// Requests that failed because the ledger could not be read or written.
    pub storage_errors: IntCounter,
    /// Wall time of a vote submission (check, insert and re-tally), in milliseconds.
    pub submit_duration_ms: Histogram,
}

impl PollMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_accepted = register_int_counter_with_registry!(
            Opts::new("poll_votes_accepted_total", "Total votes accepted"),
            registry
        )
        .expect("failed to register votes_accepted counter");

        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new("poll_votes_rejected_total", "Total vote attempts rejected"),
            &["reason"],
            registry
        )
        .expect("failed to register votes_rejected counter");

        let storage_errors = register_int_counter_with_registry!(
            Opts::new(
                "poll_storage_errors_total",
                "Total requests failed by ledger storage errors"
            ),
            registry
        )
        .expect("failed to register storage_errors counter");

        let submit_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "poll_submit_duration_ms",
                "Time to admit or reject a vote, in milliseconds"
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
            registry
        )
        .expect("failed to register submit_duration_ms histogram");

        Self {
            registry,
            votes_accepted,
            votes_rejected,
            storage_errors,
            submit_duration_ms,
        }
    }

    pub fn record_rejection(&self, reason: &str) {
        self.votes_rejected.with_label_values(&[reason]).inc();
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}
