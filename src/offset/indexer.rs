//! Consumer-group offset index for one `(prefix, topic)` pair.
//!
//! Built fresh on every alignment: transitions are rare and the listing must
//! be current. Arbitrary third-party groups share the cluster, so ids that
//! parse to [`GroupId::Plain`] are kept (they may be the pre-Blue/Green
//! group of this very service) but only ids whose prefix matches survive the
//! filter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::admin::{KafkaAdmin, OffsetMap};
use crate::error::{BlueGreenError, Result};
use crate::group_id::{Bg1Stage, GroupId};

/// A group observed on the cluster together with its committed offsets for
/// the indexed topic.
#[derive(Debug, Clone)]
pub(crate) struct GroupIdWithOffset {
    pub group_id: GroupId,
    pub offsets: OffsetMap,
}

pub(crate) struct OffsetIndexer {
    prefix: String,
    admin: Arc<dyn KafkaAdmin>,
    groups: Vec<GroupIdWithOffset>,
}

impl OffsetIndexer {
    /// List all groups, keep those sharing `prefix`, and fetch their
    /// committed offsets restricted to `topic`.
    pub(crate) async fn new(
        prefix: &str,
        topic: &str,
        admin: Arc<dyn KafkaAdmin>,
    ) -> Result<Self> {
        let listings = admin
            .list_consumer_groups()
            .await
            .map_err(|e| BlueGreenError::admin("failed to list consumer groups", e))?;

        let mut groups = Vec::new();
        for listing in listings {
            let group_id = GroupId::parse(&listing.group_id);
            if group_id.prefix() != prefix {
                continue;
            }
            let offsets = admin
                .list_consumer_group_offsets(&listing.group_id)
                .await
                .map_err(|e| {
                    BlueGreenError::admin(
                        format!("failed to list offsets of group {}", listing.group_id),
                        e,
                    )
                })?;
            let offsets: OffsetMap = offsets
                .into_iter()
                .filter(|(tp, _)| tp.topic == topic)
                .collect();
            groups.push(GroupIdWithOffset { group_id, offsets });
        }
        debug!(prefix = %prefix, topic = %topic, groups = groups.len(), "indexed consumer groups");
        Ok(Self {
            prefix: prefix.to_string(),
            admin,
            groups,
        })
    }

    /// Has this id been observed on the cluster?
    pub(crate) fn exists(&self, group_id: &GroupId) -> bool {
        self.groups.iter().any(|g| g.group_id == *group_id)
    }

    /// Any first-generation versioned group other than the migration marker?
    pub(crate) fn bg1_versions_exist(&self) -> bool {
        self.groups.iter().any(|g| g.group_id.is_unmigrated_bg1())
    }

    /// Has a migration marker been recorded?
    pub(crate) fn bg1_versions_migrated(&self) -> bool {
        self.groups.iter().any(|g| g.group_id.is_migration_marker())
    }

    /// Predecessor groups of a versioned id: same prefix, same version,
    /// strictly earlier timestamp, most recent first. Empty for ids without
    /// a version.
    pub(crate) fn find_previous_state_offset(&self, group_id: &GroupId) -> Vec<GroupIdWithOffset> {
        let (Some(version), Some(updated)) = (group_id.version(), group_id.updated()) else {
            return Vec::new();
        };
        let mut predecessors: Vec<GroupIdWithOffset> = self
            .groups
            .iter()
            .filter(|g| {
                g.group_id.version() == Some(version)
                    && matches!(g.group_id.updated(), Some(at) if at < updated)
            })
            .cloned()
            .collect();
        predecessors.sort_by_key(|g| std::cmp::Reverse(g.group_id.updated()));
        predecessors
    }

    /// Carry the legacy first-generation offsets forward and record that the
    /// migration happened, by committing the union of the legacy groups'
    /// offsets under a marker id `{prefix}-{vA}{vB}M{now}`.
    ///
    /// A fresh indexer afterwards observes `bg1_versions_migrated() == true`,
    /// which makes the align path skip this permanently.
    pub(crate) async fn create_migration_done_from_bg1_marker_group(&self) -> Result<()> {
        let mut legacy: Vec<&GroupIdWithOffset> = self
            .groups
            .iter()
            .filter(|g| g.group_id.is_unmigrated_bg1())
            .collect();
        legacy.sort_by_key(|g| g.group_id.updated());

        let latest = legacy.last().ok_or_else(|| {
            BlueGreenError::alignment(&self.prefix, "no first-generation groups to migrate")
        })?;
        let GroupId::Bg1Versioned {
            version,
            bg_version,
            ..
        } = &latest.group_id
        else {
            return Err(BlueGreenError::alignment(
                &self.prefix,
                "migration source is not a first-generation group",
            ));
        };

        // Later commits win when the legacy groups overlap.
        let mut union: OffsetMap = HashMap::new();
        for group in &legacy {
            for (tp, offset) in &group.offsets {
                union.insert(tp.clone(), offset.clone());
            }
        }

        let marker = GroupId::Bg1Versioned {
            prefix: self.prefix.clone(),
            version: version.clone(),
            bg_version: bg_version.clone(),
            stage: Bg1Stage::Migrated,
            updated: now_seconds(),
        };
        self.admin
            .alter_consumer_group_offsets(&marker, &union)
            .await
            .map_err(|e| {
                BlueGreenError::admin(
                    format!("failed to commit offsets for migration marker group {marker}"),
                    e,
                )
            })?;
        info!(marker = %marker, offsets = union.len(), "recorded first-generation offset migration");
        Ok(())
    }
}

fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
