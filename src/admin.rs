//! Admin-side collaborator contract.
//!
//! [`KafkaAdmin`] is the seam to the native Kafka admin client. The offset
//! indexer and corrector drive it; implementations adapt whatever client the
//! application already uses. Consumer-group offsets written through
//! [`KafkaAdmin::alter_consumer_group_offsets`] are the only durable state
//! this crate produces.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::group_id::GroupId;

/// A `(topic, partition)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.partition)
    }
}

/// A committed byte-position into a partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetAndMetadata {
    pub offset: i64,
    pub metadata: Option<String>,
}

impl OffsetAndMetadata {
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            metadata: None,
        }
    }
}

impl fmt::Display for OffsetAndMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset: {}", self.offset)
    }
}

/// Result entry of a time-indexed offset lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetAndTimestamp {
    pub offset: i64,
    pub timestamp: i64,
}

impl fmt::Display for OffsetAndTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset: {}, Timestamp: {}", self.offset, self.timestamp)
    }
}

/// One partition of a topic, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    pub topic: String,
    pub partition: i32,
}

impl PartitionInfo {
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }
}

/// A consumer group as returned by the cluster listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupListing {
    pub group_id: String,
}

/// Committed offsets per partition.
pub type OffsetMap = HashMap<TopicPartition, OffsetAndMetadata>;

/// Adapter over the native Kafka admin client.
///
/// All calls honor task cancellation: dropping the future aborts the RPC from
/// the caller's point of view. Implementations must not retry internally;
/// error policy belongs to the application.
#[async_trait]
pub trait KafkaAdmin: Send + Sync {
    /// List every consumer group known to the cluster.
    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupListing>>;

    /// Committed offsets of one group, all topics.
    async fn list_consumer_group_offsets(&self, group_id: &str) -> Result<OffsetMap>;

    /// Commit the given offsets under `group_id`, creating the group if the
    /// cluster has never seen it. Kafka has no explicit create-group call.
    async fn alter_consumer_group_offsets(
        &self,
        group_id: &GroupId,
        offsets: &OffsetMap,
    ) -> Result<()>;

    /// Partitions of a topic.
    async fn partitions_for(&self, topic: &str) -> Result<Vec<PartitionInfo>>;

    /// First available offset per partition.
    async fn beginning_offsets(
        &self,
        partitions: &[TopicPartition],
    ) -> Result<HashMap<TopicPartition, i64>>;

    /// Next-to-be-written offset per partition.
    async fn end_offsets(
        &self,
        partitions: &[TopicPartition],
    ) -> Result<HashMap<TopicPartition, i64>>;

    /// Earliest offset at or after the given instant, per partition. `None`
    /// for partitions with no record at that timestamp.
    async fn offsets_for_times(
        &self,
        times: &HashMap<TopicPartition, DateTime<Utc>>,
    ) -> Result<HashMap<TopicPartition, Option<OffsetAndTimestamp>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_timestamp_display() {
        let offset = OffsetAndTimestamp {
            offset: 456,
            timestamp: 1234567890,
        };
        let rendered = offset.to_string();
        assert!(rendered.contains("Offset: 456"));
        assert!(rendered.contains("Timestamp: 1234567890"));
    }

    #[test]
    fn topic_partition_display() {
        assert_eq!(TopicPartition::new("orders", 3).to_string(), "orders/3");
    }
}
