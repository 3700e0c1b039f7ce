//! Consumer configuration.
//!
//! `BgConsumerConfig` carries everything `BgConsumer::new` needs beyond the
//! topic, prefix and the two suppliers. Options follow the builder idiom:
//! start from `BgConsumerConfig::new()` and chain `with_*` calls. The state
//! publisher is the only mandatory option; leaving it unset fails consumer
//! construction.

use std::sync::Arc;
use std::time::Duration;

use crate::admin::KafkaAdmin;
use crate::consumer::{BgStatePublisher, MessageConsumer};
use crate::error::Result;
use crate::offset::{ConsumerConsistencyMode, OffsetSetupStrategy};

/// Produces the admin adapter on demand. Called on every alignment so an
/// application can rotate credentials between transitions.
pub type AdminSupplier = Arc<dyn Fn() -> Result<Arc<dyn KafkaAdmin>> + Send + Sync>;

/// Builds the underlying consumer for a concrete group id. Called on every
/// state transition with the freshly-computed group name.
pub type ConsumerSupplier = Arc<dyn Fn(&str) -> Result<Arc<dyn MessageConsumer>> + Send + Sync>;

/// Default read timeout applied when `poll` is given no explicit timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct BgConsumerConfig {
    pub(crate) state_publisher: Option<Arc<dyn BgStatePublisher>>,
    pub(crate) read_timeout: Duration,
    pub(crate) consistency_mode: ConsumerConsistencyMode,
    pub(crate) active_offset_setup_strategy: OffsetSetupStrategy,
    pub(crate) candidate_offset_setup_strategy: OffsetSetupStrategy,
}

impl Default for BgConsumerConfig {
    fn default() -> Self {
        Self {
            state_publisher: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            consistency_mode: ConsumerConsistencyMode::Eventual,
            active_offset_setup_strategy: OffsetSetupStrategy::Latest,
            candidate_offset_setup_strategy: OffsetSetupStrategy::Latest,
        }
    }
}

impl BgConsumerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the Blue/Green state source. Mandatory.
    pub fn with_blue_green_state_publisher(mut self, publisher: Arc<dyn BgStatePublisher>) -> Self {
        self.state_publisher = Some(publisher);
        self
    }

    /// Default read timeout for `poll`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// How strictly transitions preserve the sibling's progress.
    pub fn with_consistency_mode(mut self, mode: ConsumerConsistencyMode) -> Self {
        self.consistency_mode = mode;
        self
    }

    /// Start position when a newly-aligned group plays the Active role and no
    /// predecessor exists.
    pub fn with_active_offset_setup_strategy(mut self, strategy: OffsetSetupStrategy) -> Self {
        self.active_offset_setup_strategy = strategy;
        self
    }

    /// Same, for every non-Active role.
    pub fn with_candidate_offset_setup_strategy(mut self, strategy: OffsetSetupStrategy) -> Self {
        self.candidate_offset_setup_strategy = strategy;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn consistency_mode(&self) -> ConsumerConsistencyMode {
        self.consistency_mode
    }

    pub fn active_offset_setup_strategy(&self) -> &OffsetSetupStrategy {
        &self.active_offset_setup_strategy
    }

    pub fn candidate_offset_setup_strategy(&self) -> &OffsetSetupStrategy {
        &self.candidate_offset_setup_strategy
    }
}
