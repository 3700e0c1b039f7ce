//! Offset setup for freshly-named consumer groups.
//!
//! Every Blue/Green transition renames the consumer group, and the new group
//! starts with no committed offsets. This module decides where it begins:
//!
//! - [`strategy`]: the configurable start-position policies and the
//!   consistency modes governing inheritance
//! - [`indexer`]: a snapshot of every group sharing the prefix, with
//!   classification and predecessor lookup
//! - [`corrector`]: the alignment decision tree, including the one-shot
//!   migration of first-generation offsets

pub mod corrector;
pub mod indexer;
pub mod strategy;

pub use strategy::{ConsumerConsistencyMode, OffsetSetupStrategy};

pub(crate) use corrector::OffsetManager;
