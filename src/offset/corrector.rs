//! Offset correction on state transitions.
//!
//! The corrector chooses initial offsets for a freshly-named group, either by
//! inheriting from the right predecessor group or by installing a configured
//! start-position strategy, and writes them through the admin adapter. Admin
//! writes happen only after every calculation has succeeded, so a failure
//! part-way leaves no partial offsets behind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::admin::{KafkaAdmin, OffsetAndMetadata, OffsetMap, TopicPartition};
use crate::config::AdminSupplier;
use crate::error::{BlueGreenError, Result};
use crate::group_id::{compare_group_states, GroupId};
use crate::offset::indexer::{GroupIdWithOffset, OffsetIndexer};
use crate::offset::strategy::{
    expected_predecessor_pair, ConsumerConsistencyMode, OffsetSetupStrategy,
};
use crate::state::BgState;

pub(crate) struct OffsetCorrector {
    topic: String,
    admin: Arc<dyn KafkaAdmin>,
    indexer: OffsetIndexer,
    consistency_mode: ConsumerConsistencyMode,
    active_offset_setup_strategy: OffsetSetupStrategy,
    candidate_offset_setup_strategy: OffsetSetupStrategy,
}

impl OffsetCorrector {
    pub(crate) fn new(
        topic: impl Into<String>,
        admin: Arc<dyn KafkaAdmin>,
        indexer: OffsetIndexer,
        consistency_mode: ConsumerConsistencyMode,
        active_offset_setup_strategy: OffsetSetupStrategy,
        candidate_offset_setup_strategy: OffsetSetupStrategy,
    ) -> Self {
        Self {
            topic: topic.into(),
            admin,
            indexer,
            consistency_mode,
            active_offset_setup_strategy,
            candidate_offset_setup_strategy,
        }
    }

    /// Compute an initial offset for every partition of the topic by
    /// strategy alone.
    pub(crate) async fn install(&self, strategy: &OffsetSetupStrategy) -> Result<OffsetMap> {
        let partitions = self.admin.partitions_for(&self.topic).await?;
        let topic_partitions: Vec<TopicPartition> = partitions
            .iter()
            .map(|p| p.topic_partition())
            .collect();

        match strategy {
            OffsetSetupStrategy::Earliest => {
                let offsets = self
                    .admin
                    .beginning_offsets(&topic_partitions)
                    .await
                    .map_err(|e| {
                        BlueGreenError::admin(
                            format!("failed to calculate BeginningOffsets for topic {}", self.topic),
                            e,
                        )
                    })?;
                Ok(to_offset_map(offsets))
            }
            OffsetSetupStrategy::Latest => {
                let offsets = self.admin.end_offsets(&topic_partitions).await.map_err(|e| {
                    BlueGreenError::admin(
                        format!("failed to calculate EndOffsets for topic {}", self.topic),
                        e,
                    )
                })?;
                Ok(to_offset_map(offsets))
            }
            OffsetSetupStrategy::Rewind(shift) => {
                let target = Utc::now()
                    - chrono::Duration::from_std(*shift).map_err(|e| {
                        BlueGreenError::config(format!("rewind shift out of range: {e}"))
                    })?;
                let times: HashMap<TopicPartition, chrono::DateTime<Utc>> = topic_partitions
                    .iter()
                    .map(|tp| (tp.clone(), target))
                    .collect();
                let by_time = self.admin.offsets_for_times(&times).await.map_err(|e| {
                    BlueGreenError::admin(
                        format!("failed to calculate OffsetsForTimes for topic {}", self.topic),
                        e,
                    )
                })?;
                // Partitions without an offset at the target instant fall
                // back to end-of-partition, so both lookups are mandatory.
                let ends = self.admin.end_offsets(&topic_partitions).await.map_err(|e| {
                    BlueGreenError::admin(
                        format!("failed to calculate EndOffsets for topic {}", self.topic),
                        e,
                    )
                })?;
                let mut chosen = OffsetMap::new();
                for tp in &topic_partitions {
                    let offset = match by_time.get(tp).copied().flatten() {
                        Some(found) => found.offset,
                        None => *ends.get(tp).ok_or_else(|| {
                            BlueGreenError::admin(
                                format!("failed to calculate EndOffsets for topic {}", self.topic),
                                format!("missing end offset for partition {tp}"),
                            )
                        })?,
                    };
                    chosen.insert(tp.clone(), OffsetAndMetadata::new(offset));
                }
                Ok(chosen)
            }
        }
    }

    /// Ensure `target` has a committed offset for every partition, inheriting
    /// from a predecessor group where one exists, and run the one-shot
    /// first-generation migration when unmigrated legacy offsets are found.
    pub(crate) async fn align(&self, target: &GroupId) -> Result<()> {
        if self.indexer.exists(target) {
            if !self.indexer.bg1_versions_exist() {
                debug!(group = %target, "group exists, no legacy offsets, nothing to align");
                return Ok(());
            }
            if self.indexer.bg1_versions_migrated() {
                debug!(group = %target, "legacy offsets already migrated");
                return Ok(());
            }
            // The group exists but unmigrated legacy offsets remain: carry an
            // offset into the target and record the marker.
            let chosen = match self.inherit(target) {
                Some(offsets) => offsets,
                None => self.install(&self.active_offset_setup_strategy).await?,
            };
            self.alter(target, &chosen).await?;
            self.indexer
                .create_migration_done_from_bg1_marker_group()
                .await?;
            info!(group = %target, "aligned offsets and migrated legacy groups");
            Ok(())
        } else {
            let chosen = match self.inherit(target) {
                Some(offsets) => offsets,
                None => self.install(self.strategy_for(target)).await?,
            };
            self.alter(target, &chosen).await?;
            info!(group = %target, offsets = chosen.len(), "installed offsets for new group");
            Ok(())
        }
    }

    /// Pick a predecessor group to inherit offsets from, per the configured
    /// consistency mode. A predecessor with no committed offsets for the
    /// topic is treated as no inheritance so the strategy fallback still
    /// covers every partition.
    fn inherit(&self, target: &GroupId) -> Option<OffsetMap> {
        let predecessors = self.indexer.find_previous_state_offset(target);
        let chosen: Option<&GroupIdWithOffset> = match self.consistency_mode {
            ConsumerConsistencyMode::Eventual => predecessors.first(),
            ConsumerConsistencyMode::GuaranteeConsumption => {
                let expected = match target {
                    GroupId::Versioned {
                        state,
                        sibling_state,
                        ..
                    } => expected_predecessor_pair(*state, *sibling_state),
                    _ => None,
                };
                expected
                    .and_then(|(state, sibling)| {
                        predecessors
                            .iter()
                            .find(|p| compare_group_states(Some(&p.group_id), state, sibling))
                    })
                    .or_else(|| predecessors.first())
            }
        };
        let chosen = chosen?;
        if chosen.offsets.is_empty() {
            return None;
        }
        debug!(
            group = %target,
            predecessor = %chosen.group_id,
            "inheriting offsets from predecessor group"
        );
        Some(chosen.offsets.clone())
    }

    fn strategy_for(&self, target: &GroupId) -> &OffsetSetupStrategy {
        match target {
            GroupId::Versioned {
                state: BgState::Active,
                ..
            } => &self.active_offset_setup_strategy,
            _ => &self.candidate_offset_setup_strategy,
        }
    }

    async fn alter(&self, target: &GroupId, offsets: &OffsetMap) -> Result<()> {
        self.admin
            .alter_consumer_group_offsets(target, offsets)
            .await
            .map_err(|e| {
                BlueGreenError::admin(
                    format!("failed to alter offsets of group {target}"),
                    e,
                )
            })
    }
}

fn to_offset_map(offsets: HashMap<TopicPartition, i64>) -> OffsetMap {
    offsets
        .into_iter()
        .map(|(tp, offset)| (tp, OffsetAndMetadata::new(offset)))
        .collect()
}

/// Per-transition entry point: rebuilds the indexer (the listing must be
/// fresh) and runs [`OffsetCorrector::align`] for the target group.
pub(crate) struct OffsetManager {
    topic: String,
    admin_supplier: AdminSupplier,
    consistency_mode: ConsumerConsistencyMode,
    active_offset_setup_strategy: OffsetSetupStrategy,
    candidate_offset_setup_strategy: OffsetSetupStrategy,
}

impl OffsetManager {
    pub(crate) fn new(
        topic: impl Into<String>,
        admin_supplier: AdminSupplier,
        consistency_mode: ConsumerConsistencyMode,
        active_offset_setup_strategy: OffsetSetupStrategy,
        candidate_offset_setup_strategy: OffsetSetupStrategy,
    ) -> Self {
        Self {
            topic: topic.into(),
            admin_supplier,
            consistency_mode,
            active_offset_setup_strategy,
            candidate_offset_setup_strategy,
        }
    }

    pub(crate) async fn align_offset(&self, target: &GroupId) -> Result<()> {
        let admin = (self.admin_supplier)()
            .map_err(|e| BlueGreenError::admin("failed to get admin", e))?;
        let indexer =
            OffsetIndexer::new(target.prefix(), &self.topic, Arc::clone(&admin)).await?;
        let corrector = OffsetCorrector::new(
            self.topic.clone(),
            admin,
            indexer,
            self.consistency_mode,
            self.active_offset_setup_strategy.clone(),
            self.candidate_offset_setup_strategy.clone(),
        );
        corrector.align(target).await
    }
}
