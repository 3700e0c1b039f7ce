//! Offset start-position strategies and consistency modes.

use std::fmt;
use std::time::Duration;

use crate::state::BgState;

/// Where a freshly-named group starts when no predecessor offsets exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetSetupStrategy {
    /// Begin of partition.
    Earliest,
    /// End of partition.
    Latest,
    /// The offset at `now − shift`. Partitions with no record at that
    /// timestamp fall back to end-of-partition, which can skip data near the
    /// rewind horizon; operators should size the shift generously.
    Rewind(Duration),
}

impl OffsetSetupStrategy {
    /// Rewind by the given shift.
    pub fn rewind(shift: Duration) -> Self {
        OffsetSetupStrategy::Rewind(shift)
    }

    /// Rewind shift; zero for the fixed strategies.
    pub fn shift(&self) -> Duration {
        match self {
            OffsetSetupStrategy::Rewind(shift) => *shift,
            _ => Duration::ZERO,
        }
    }
}

impl fmt::Display for OffsetSetupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetSetupStrategy::Earliest => f.write_str("earliest"),
            OffsetSetupStrategy::Latest => f.write_str("latest"),
            OffsetSetupStrategy::Rewind(shift) => write!(f, "rewind on {shift:?}"),
        }
    }
}

/// How strictly a group transition preserves the sibling's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumerConsistencyMode {
    /// Inherit from the most recent predecessor group, whatever its state.
    #[default]
    Eventual,
    /// Inherit from the exact handover predecessor in the lifecycle graph so
    /// no message committed by the sibling is skipped; fall back to the most
    /// recent predecessor when the graph has no match.
    GuaranteeConsumption,
}

/// The `(state, sibling_state)` pair a group must have carried immediately
/// before a group with the given pair, per the Blue/Green lifecycle:
/// warmup installs a candidate next to the active, promote swaps the pair to
/// active/legacy, commit retires the legacy side, rollback reverses promote.
pub(crate) fn expected_predecessor_pair(
    state: BgState,
    sibling_state: BgState,
) -> Option<(BgState, BgState)> {
    match (state, sibling_state) {
        // Warmup: the running side watched the candidate appear.
        (BgState::Active, BgState::Candidate) => Some((BgState::Active, BgState::Idle)),
        // Promote: this version was the candidate a step ago.
        (BgState::Active, BgState::Legacy) => Some((BgState::Candidate, BgState::Active)),
        // Commit: the sibling went from legacy to retired.
        (BgState::Active, BgState::Idle) => Some((BgState::Active, BgState::Legacy)),
        // Rollback: a promoted version demoted back to candidate.
        (BgState::Candidate, BgState::Active) => Some((BgState::Active, BgState::Legacy)),
        // Promote, losing side: this version was active before the swap.
        (BgState::Legacy, BgState::Active) => Some((BgState::Active, BgState::Candidate)),
        // Commit, losing side: retired after draining.
        (BgState::Idle, BgState::Active) => Some((BgState::Legacy, BgState::Active)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_keeps_its_shift() {
        let shift = Duration::from_secs(3723) + Duration::from_millis(4);
        let strategy = OffsetSetupStrategy::rewind(shift);
        assert_eq!(strategy.shift(), shift);
        assert_eq!(strategy.to_string(), format!("rewind on {shift:?}"));
    }

    #[test]
    fn fixed_strategies_have_zero_shift() {
        assert_eq!(OffsetSetupStrategy::Earliest.shift(), Duration::ZERO);
        assert_eq!(OffsetSetupStrategy::Latest.shift(), Duration::ZERO);
        assert_eq!(OffsetSetupStrategy::Latest.to_string(), "latest");
        assert_eq!(OffsetSetupStrategy::Earliest.to_string(), "earliest");
    }

    #[test]
    fn consistency_mode_defaults_to_eventual() {
        assert_eq!(
            ConsumerConsistencyMode::default(),
            ConsumerConsistencyMode::Eventual
        );
    }

    #[test]
    fn lifecycle_graph_names_the_handover_predecessor() {
        assert_eq!(
            expected_predecessor_pair(BgState::Active, BgState::Candidate),
            Some((BgState::Active, BgState::Idle))
        );
        assert_eq!(
            expected_predecessor_pair(BgState::Legacy, BgState::Active),
            Some((BgState::Active, BgState::Candidate))
        );
        assert_eq!(
            expected_predecessor_pair(BgState::Idle, BgState::Active),
            Some((BgState::Legacy, BgState::Active))
        );
        // A brand-new candidate has no prior step with the same version.
        assert_eq!(
            expected_predecessor_pair(BgState::Candidate, BgState::Idle),
            None
        );
    }
}
