//! The Blue/Green-aware consumer.
//!
//! `BgConsumer` wraps one underlying partition-assigned consumer at a time.
//! When the state publisher announces a transition, the next `poll` closes
//! the current consumer, computes a fresh group name, aligns its offsets and
//! resubscribes under the new name. Every message comes back with a filter
//! verdict and a commit marker; the wrapper never drops a message silently,
//! so applications can observe rejected traffic.
//!
//! Concurrency discipline: the poll mutex owns the underlying consumer and
//! the active-state swap. Publisher callbacks only park the new state in an
//! atomic slot; commits read atomic snapshots and never block polling. A
//! state change therefore takes effect between two polls, never mid-read.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::admin::{OffsetAndMetadata, TopicPartition};
use crate::config::{AdminSupplier, BgConsumerConfig, ConsumerSupplier};
use crate::error::{BlueGreenError, Result};
use crate::filter::Filter;
use crate::group_id::GroupId;
use crate::headers::{get_x_version, Header};
use crate::metrics::{ConsumerStats, StatsSnapshot};
use crate::offset::OffsetManager;
use crate::state::{BlueGreenState, NamespaceVersion};

/// A consumed Kafka record, as surfaced by the underlying consumer.
pub trait Message: Send + Sync {
    fn topic(&self) -> &str;
    fn partition(&self) -> i32;
    fn offset(&self) -> i64;
    fn headers(&self) -> &[Header];
    fn key(&self) -> Option<&[u8]>;
    fn value(&self) -> Option<&[u8]>;
}

/// The underlying consumer, rebuilt per state epoch.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Read the next message. Cancellation-safe: dropping the future must
    /// leave the consumer usable.
    async fn read_message(&self) -> Result<Box<dyn Message>>;

    /// Commit the marker's offset under the consumer's group.
    async fn commit(&self, marker: &CommitMarker) -> Result<()>;

    /// Release the group membership. Called at most once per epoch.
    async fn close(&self) -> Result<()>;
}

/// Callback invoked by the state publisher on every update.
pub type StateCallback = Box<dyn Fn(BlueGreenState) + Send + Sync>;

/// Source of Blue/Green state snapshots.
#[async_trait]
pub trait BgStatePublisher: Send + Sync {
    /// Current snapshot.
    fn get_state(&self) -> BlueGreenState;

    /// Register a callback, invoked on every update including the first.
    /// Callbacks run on the publisher's task and must not block.
    async fn subscribe(&self, callback: StateCallback);
}

/// Ties a polled message to the state epoch it was read under. Passed back
/// on commit; a marker from a superseded epoch is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMarker {
    pub topic_partition: TopicPartition,
    pub offset: OffsetAndMetadata,
    pub version: NamespaceVersion,
}

impl fmt::Display for CommitMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topic: {}, Partition: {}, Offset: {}, Version: {}",
            self.topic_partition.topic,
            self.topic_partition.partition,
            self.offset.offset,
            self.version.version
        )
    }
}

/// One polled message with its filter verdict.
pub struct Record {
    pub message: Box<dyn Message>,
    /// Whether the version filter accepted the message for this side.
    pub accepted: bool,
    /// Filter evaluation error, if any; such messages are rejected.
    pub filter_err: Option<BlueGreenError>,
    pub commit_marker: CommitMarker,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("topic", &self.message.topic())
            .field("partition", &self.message.partition())
            .field("offset", &self.message.offset())
            .field("accepted", &self.accepted)
            .field("filter_err", &self.filter_err)
            .field("commit_marker", &self.commit_marker)
            .finish()
    }
}

/// Blue/Green-aware wrapper around a partition-assigned consumer.
pub struct BgConsumer {
    topic: String,
    group_id_prefix: String,
    consumer_supplier: ConsumerSupplier,
    offset_manager: OffsetManager,
    read_timeout: Duration,
    /// Owned by the poll mutex holder; commit only clones the Arc.
    consumer: RwLock<Option<Arc<dyn MessageConsumer>>>,
    poll_mux: Mutex<()>,
    bg_state_active: ArcSwap<BlueGreenState>,
    /// Single-slot hand-off from the publisher callback to the poll thread.
    bg_state_change: Arc<ArcSwapOption<BlueGreenState>>,
    version_filter: ArcSwap<Filter>,
    stats: ConsumerStats,
    closed: AtomicBool,
}

impl BgConsumer {
    /// Build a consumer wrapper for `topic` whose group names share
    /// `group_id_prefix`.
    ///
    /// The underlying consumer is not created here; the first `poll` builds
    /// it through the same path that handles state transitions. A missing
    /// state publisher is a construction-time error.
    pub async fn new(
        topic: impl Into<String>,
        group_id_prefix: impl Into<String>,
        admin_supplier: AdminSupplier,
        consumer_supplier: ConsumerSupplier,
        config: BgConsumerConfig,
    ) -> Result<Self> {
        let topic = topic.into();
        let publisher = config
            .state_publisher
            .clone()
            .ok_or_else(|| BlueGreenError::config("blue/green state publisher is not configured"))?;

        let initial = publisher.get_state();
        let bg_state_change: Arc<ArcSwapOption<BlueGreenState>> =
            Arc::new(ArcSwapOption::const_empty());
        let slot = Arc::clone(&bg_state_change);
        publisher
            .subscribe(Box::new(move |state| {
                slot.store(Some(Arc::new(state)));
            }))
            .await;

        Ok(Self {
            offset_manager: OffsetManager::new(
                topic.clone(),
                admin_supplier,
                config.consistency_mode,
                config.active_offset_setup_strategy.clone(),
                config.candidate_offset_setup_strategy.clone(),
            ),
            group_id_prefix: group_id_prefix.into(),
            consumer_supplier,
            read_timeout: config.read_timeout,
            consumer: RwLock::new(None),
            poll_mux: Mutex::new(()),
            bg_state_active: ArcSwap::from_pointee(initial.clone()),
            bg_state_change,
            version_filter: ArcSwap::from_pointee(Filter::new(&initial)),
            stats: ConsumerStats::new(topic.clone()),
            closed: AtomicBool::new(false),
            topic,
        })
    }

    /// Read the next message, applying any pending state transition first.
    ///
    /// Returns every message together with its filter verdict; the caller
    /// decides what to do with rejected traffic. Alignment failures leave the
    /// wrapper uninitialized and the next call retries the transition.
    pub async fn poll(&self, timeout: Duration) -> Result<Record> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BlueGreenError::Closed);
        }
        let _poll = self.poll_mux.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(BlueGreenError::Closed);
        }

        let pending = self.bg_state_change.swap(None);
        if pending.is_some() || self.consumer.read().is_none() {
            let state = pending
                .clone()
                .unwrap_or_else(|| self.bg_state_active.load_full());
            if let Err(e) = self.rebuild(&state).await {
                self.restore_pending(pending);
                return Err(e);
            }
        }

        let consumer = self
            .consumer
            .read()
            .clone()
            .ok_or(BlueGreenError::Closed)?;
        let message = tokio::time::timeout(timeout, consumer.read_message())
            .await
            .map_err(|_| BlueGreenError::Timeout(timeout))??;

        let version = get_x_version(message.headers());
        let (accepted, filter_err) = match self.version_filter.load().test(&version) {
            Ok(verdict) => (verdict, None),
            Err(e) => (false, Some(e)),
        };
        self.stats.record_verdict(accepted, filter_err.is_some());

        let active = self.bg_state_active.load();
        let commit_marker = CommitMarker {
            topic_partition: TopicPartition::new(message.topic().to_string(), message.partition()),
            offset: OffsetAndMetadata::new(message.offset() + 1),
            version: active.current.clone(),
        };
        Ok(Record {
            message,
            accepted,
            filter_err,
            commit_marker,
        })
    }

    /// Like [`poll`](BgConsumer::poll) with the configured default timeout.
    pub async fn poll_default(&self) -> Result<Record> {
        self.poll(self.read_timeout).await
    }

    /// Commit a marker returned by `poll`. A marker from a superseded state
    /// epoch is acknowledged without touching the underlying consumer: its
    /// group no longer receives this side's traffic.
    pub async fn commit(&self, marker: &CommitMarker) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BlueGreenError::Closed);
        }
        let active = self.bg_state_active.load();
        if marker.version != active.current {
            debug!(marker = %marker, active = %active.current, "ignoring stale commit marker");
            return Ok(());
        }
        let consumer = self.consumer.read().clone();
        match consumer {
            Some(consumer) => consumer.commit(marker).await,
            None => Ok(()),
        }
    }

    /// Close the wrapper and the underlying consumer. Idempotent, safe from
    /// any thread; waits for an in-flight poll to finish.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _poll = self.poll_mux.lock().await;
        // Drop the write guard before awaiting the close; commit reads this
        // lock.
        let consumer = self.consumer.write().take();
        if let Some(consumer) = consumer {
            consumer.close().await?;
        }
        info!(topic = %self.topic, "closed blue/green consumer");
        Ok(())
    }

    /// Counter snapshot for this consumer.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Presentation of the live filter, for logs.
    pub fn filter_presentation(&self) -> String {
        self.version_filter.load().to_string()
    }

    /// Close the superseded consumer (if any) and subscribe under a fresh
    /// group aligned to `state`. Caller holds the poll mutex.
    async fn rebuild(&self, state: &BlueGreenState) -> Result<()> {
        // Take the slot in its own statement: an `if let` scrutinee would
        // keep the write guard alive across the close await, and commit
        // reads this lock.
        let old = self.consumer.write().take();
        if let Some(old) = old {
            if let Err(e) = old.close().await {
                warn!(topic = %self.topic, error = %e, "failed to close superseded consumer");
            }
        }

        let group = GroupId::versioned(
            self.group_id_prefix.clone(),
            state.current.version.clone(),
            state.current.state,
            state.sibling_state(),
            Utc::now(),
        );
        self.offset_manager.align_offset(&group).await?;
        let consumer = (self.consumer_supplier)(&group.to_string())?;
        *self.consumer.write() = Some(consumer);

        self.bg_state_active.store(Arc::new(state.clone()));
        self.version_filter.store(Arc::new(Filter::new(state)));
        self.stats.record_rebuild();
        info!(
            topic = %self.topic,
            group = %group,
            filter = %self.filter_presentation(),
            "subscribed consumer under new group"
        );
        Ok(())
    }

    /// Put a transition back into the hand-off slot after a failed rebuild,
    /// unless the publisher has delivered a newer state meanwhile.
    fn restore_pending(&self, pending: Option<Arc<BlueGreenState>>) {
        let Some(state) = pending else { return };
        let observed = self.bg_state_change.load();
        if observed.is_none() {
            let _ = self
                .bg_state_change
                .compare_and_swap(&observed, Some(state));
        }
    }
}
