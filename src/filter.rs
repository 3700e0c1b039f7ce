//! Version filtering against the live Blue/Green state.
//!
//! The active side takes everything not claimed by the sibling, unversioned
//! traffic included. A candidate or legacy side is strict and accepts only
//! its own version, so a candidate cannot steal production traffic during
//! rollout.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::consumer::BgStatePublisher;
use crate::error::{BlueGreenError, Result};
use crate::state::{BgState, BlueGreenState, Version};

/// Predicate over `x-version` header values, built from one state snapshot.
#[derive(Debug, Clone)]
pub struct Filter {
    presentation: String,
    predicate: Predicate,
}

#[derive(Debug, Clone)]
enum Predicate {
    AcceptAll,
    NotVersion(Version),
    ExactVersion(Version),
    RejectAll { state: BgState },
}

impl Filter {
    pub fn new(bg_state: &BlueGreenState) -> Self {
        let sibling = bg_state
            .sibling
            .as_ref()
            .filter(|s| s.state != BgState::Idle);
        let Some(sibling) = sibling else {
            return Self {
                presentation: "true".to_string(),
                predicate: Predicate::AcceptAll,
            };
        };
        match bg_state.current.state {
            BgState::Active => Self {
                presentation: format!("!{}", sibling.version),
                predicate: Predicate::NotVersion(sibling.version.clone()),
            },
            BgState::Candidate | BgState::Legacy => Self {
                presentation: bg_state.current.version.to_string(),
                predicate: Predicate::ExactVersion(bg_state.current.version.clone()),
            },
            state => Self {
                presentation: "false".to_string(),
                predicate: Predicate::RejectAll { state },
            },
        }
    }

    /// Test a header value. An unparseable version on a strict side is an
    /// error, surfaced per call so the caller can observe rejected traffic.
    pub fn test(&self, version: &str) -> Result<bool> {
        match &self.predicate {
            Predicate::AcceptAll => Ok(true),
            Predicate::NotVersion(sibling) => {
                let parsed = Version::parse(version)?;
                Ok(parsed != *sibling)
            }
            Predicate::ExactVersion(current) => {
                let parsed = Version::parse(version)?;
                Ok(parsed == *current)
            }
            Predicate::RejectAll { state } => {
                Err(BlueGreenError::InvalidState(state.to_string()))
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.presentation)
    }
}

/// Atomically replaceable filter that tracks a state publisher.
///
/// Readers do a lock-free load; the publisher callback replaces the snapshot.
/// Seed it from `publisher.get_state()` and feed every published update into
/// [`TrackingVersionFilter::update`].
pub struct TrackingVersionFilter {
    predicate: Arc<ArcSwap<Filter>>,
}

impl TrackingVersionFilter {
    pub fn new(initial: &BlueGreenState) -> Self {
        Self {
            predicate: Arc::new(ArcSwap::from_pointee(Filter::new(initial))),
        }
    }

    /// Seed from the publisher's current state and follow every update it
    /// delivers from then on.
    pub async fn subscribe(publisher: &dyn BgStatePublisher) -> Arc<Self> {
        let tracking = Arc::new(Self::new(&publisher.get_state()));
        let follower = Arc::clone(&tracking);
        publisher
            .subscribe(Box::new(move |state| follower.update(&state)))
            .await;
        tracking
    }

    /// Replace the snapshot. Safe to call from the publisher's thread while
    /// readers are testing.
    pub fn update(&self, state: &BlueGreenState) {
        self.predicate.store(Arc::new(Filter::new(state)));
    }

    pub fn test(&self, version: &str) -> Result<bool> {
        self.predicate.load().test(version)
    }
}

impl fmt::Display for TrackingVersionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate.load().to_string())
    }
}
