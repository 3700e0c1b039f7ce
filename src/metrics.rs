//! Metrics for Blue/Green consumers.
//!
//! Two surfaces: the `metrics` facade for whatever recorder the application
//! installs (feature-gated; every function becomes a no-op without the
//! `metrics` feature, keeping the API surface identical), and an always-on
//! atomic counter snapshot returned by `BgConsumer::stats`.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use serde::Serialize;

/// Register all counters with their descriptions.
///
/// Optional; call once after installing a recorder if you want described
/// metrics in the exposition.
#[cfg(feature = "metrics")]
pub fn register_metrics() {
    describe_counter!(
        "bluestream_messages_received_total",
        "Total messages returned by poll, by topic"
    );
    describe_counter!(
        "bluestream_messages_accepted_total",
        "Messages accepted by the version filter, by topic"
    );
    describe_counter!(
        "bluestream_messages_rejected_total",
        "Messages rejected by the version filter, by topic"
    );
    describe_counter!(
        "bluestream_filter_errors_total",
        "Messages whose version header failed filter evaluation, by topic"
    );
    describe_counter!(
        "bluestream_consumer_rebuilds_total",
        "Underlying consumer rebuilds driven by state transitions, by topic"
    );
}

#[cfg(not(feature = "metrics"))]
pub fn register_metrics() {}

/// Record one poll verdict.
#[cfg(feature = "metrics")]
pub(crate) fn record_message_verdict(topic: &str, accepted: bool, filter_error: bool) {
    counter!(
        "bluestream_messages_received_total",
        "topic" => topic.to_string()
    )
    .increment(1);
    if filter_error {
        counter!(
            "bluestream_filter_errors_total",
            "topic" => topic.to_string()
        )
        .increment(1);
    } else if accepted {
        counter!(
            "bluestream_messages_accepted_total",
            "topic" => topic.to_string()
        )
        .increment(1);
    } else {
        counter!(
            "bluestream_messages_rejected_total",
            "topic" => topic.to_string()
        )
        .increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_message_verdict(_topic: &str, _accepted: bool, _filter_error: bool) {}

/// Record a consumer rebuild after a state transition.
#[cfg(feature = "metrics")]
pub(crate) fn record_consumer_rebuild(topic: &str) {
    counter!(
        "bluestream_consumer_rebuilds_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_consumer_rebuild(_topic: &str) {}

/// Per-consumer counters, independent of the facade.
#[derive(Debug)]
pub struct ConsumerStats {
    topic: String,
    received: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    filter_errors: AtomicU64,
    rebuilds: AtomicU64,
}

impl ConsumerStats {
    pub(crate) fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            received: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            filter_errors: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_verdict(&self, accepted: bool, filter_error: bool) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if filter_error {
            self.filter_errors.fetch_add(1, Ordering::Relaxed);
        } else if accepted {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        record_message_verdict(&self.topic, accepted, filter_error);
    }

    pub(crate) fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        record_consumer_rebuild(&self.topic);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            topic: self.topic.clone(),
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            filter_errors: self.filter_errors.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a consumer's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub topic: String,
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub filter_errors: u64,
    pub rebuilds: u64,
}
