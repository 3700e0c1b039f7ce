#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Bluestream
//!
//! Bluestream is a Blue/Green-aware wrapper around a partition-assigned
//! Kafka consumer. It delivers exactly the messages destined for the
//! *current* deployment version of a service and transparently re-targets
//! the consumer group as the surrounding traffic-shaping state machine
//! (active / candidate / legacy / idle) advances.
//!
//! ## How it works
//!
//! - Consumer groups are named `{prefix}-{version}-{state}_{siblingState}-{timestamp}`,
//!   so the group identity encodes the deployment epoch it belongs to.
//! - On every state transition the wrapper closes the underlying consumer,
//!   computes fresh per-partition offsets for the new group (inheriting from
//!   the right predecessor group where one exists) and resubscribes.
//! - Each polled message is checked against the live state via its
//!   `x-version` header; the verdict is returned with the message, never
//!   silently applied.
//! - Offsets committed under the retired first-generation naming scheme are
//!   migrated once, atomically, with a marker group recording completion.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bluestream::{BgConsumer, BgConsumerConfig};
//!
//! let config = BgConsumerConfig::new()
//!     .with_blue_green_state_publisher(publisher)
//!     .with_timeout(Duration::from_secs(5));
//!
//! let consumer = BgConsumer::new(
//!     "orders",
//!     "order-processors",
//!     admin_supplier,      // adapts your Kafka admin client
//!     consumer_supplier,   // builds a consumer for a concrete group id
//!     config,
//! )
//! .await?;
//!
//! loop {
//!     let record = consumer.poll(Duration::from_secs(5)).await?;
//!     if record.accepted {
//!         handle(&record.message);
//!         consumer.commit(&record.commit_marker).await?;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`consumer`]: the poll loop, commit protocol and lifecycle
//! - [`filter`]: version filtering against the live state
//! - [`group_id`]: the group-id naming codec (three wire shapes)
//! - [`offset`]: offset setup, predecessor inheritance and legacy migration
//! - [`admin`]: the admin-client seam and wire value types
//! - [`headers`]: record-header helpers
//! - [`state`]: the Blue/Green state model
//! - [`config`]: configuration and builder options
//! - [`metrics`]: counters and the stats snapshot
//! - [`error`]: error types and Result alias
//!
//! The wrapper owns one underlying consumer at a time and spawns no tasks of
//! its own; scaling out means running more wrappers.

pub mod admin;
pub mod config;
pub mod consumer;
pub mod error;
pub mod filter;
pub mod group_id;
pub mod headers;
pub mod metrics;
pub mod offset;
pub mod state;

pub use admin::{
    ConsumerGroupListing, KafkaAdmin, OffsetAndMetadata, OffsetAndTimestamp, OffsetMap,
    PartitionInfo, TopicPartition,
};
pub use config::{AdminSupplier, BgConsumerConfig, ConsumerSupplier, DEFAULT_READ_TIMEOUT};
pub use consumer::{
    BgConsumer, BgStatePublisher, CommitMarker, Message, MessageConsumer, Record, StateCallback,
};
pub use error::{BlueGreenError, BoxError, Result};
pub use filter::{Filter, TrackingVersionFilter};
pub use group_id::{compare_group_states, Bg1Stage, GroupId};
pub use headers::{build_headers, extract_headers, get_x_version, Header};
pub use metrics::{register_metrics, ConsumerStats, StatsSnapshot};
pub use offset::{ConsumerConsistencyMode, OffsetSetupStrategy};
pub use state::{BgState, BlueGreenState, NamespaceVersion, Version};
