//! Blue/Green deployment state model.
//!
//! A deployment namespace runs at most two versions side by side. One side is
//! *Active* (takes production traffic), the other is *Candidate* (warming up),
//! *Legacy* (being drained) or *Idle* (fully retired). The state publisher
//! delivers a [`BlueGreenState`] snapshot on every transition; this crate only
//! ever reads it.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BlueGreenError, Result};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^v\d+$").unwrap_or_else(|_| unreachable!()))
}

/// Deployment version token, e.g. `v1`.
///
/// Tokens are opaque and compared by equality; anything not matching
/// `v<digits>` is a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Parse a version token.
    pub fn parse(token: &str) -> Result<Self> {
        if version_pattern().is_match(token) {
            Ok(Self(token.to_string()))
        } else {
            Err(BlueGreenError::InvalidVersion(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Version {
    type Err = BlueGreenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of one side of a Blue/Green namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BgState {
    Active,
    Candidate,
    Legacy,
    Idle,
}

impl BgState {
    /// Single-character code used in group-id wire formats.
    pub fn code(&self) -> char {
        match self {
            BgState::Active => 'a',
            BgState::Candidate => 'c',
            BgState::Legacy => 'l',
            BgState::Idle => 'i',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'a' => Some(BgState::Active),
            'c' => Some(BgState::Candidate),
            'l' => Some(BgState::Legacy),
            'i' => Some(BgState::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for BgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BgState::Active => "active",
            BgState::Candidate => "candidate",
            BgState::Legacy => "legacy",
            BgState::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// One side of a namespace: which version runs there and in what state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceVersion {
    pub namespace: String,
    pub version: Version,
    pub state: BgState,
}

impl NamespaceVersion {
    pub fn new(namespace: impl Into<String>, version: Version, state: BgState) -> Self {
        Self {
            namespace: namespace.into(),
            version,
            state,
        }
    }
}

impl fmt::Display for NamespaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({})",
            self.namespace, self.version, self.state
        )
    }
}

/// Snapshot of a namespace pair as published by the state monitor.
///
/// `sibling` is absent when only one version is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueGreenState {
    pub current: NamespaceVersion,
    pub sibling: Option<NamespaceVersion>,
}

impl BlueGreenState {
    pub fn new(current: NamespaceVersion, sibling: Option<NamespaceVersion>) -> Self {
        Self { current, sibling }
    }

    /// State code the sibling side contributes to a group id; `Idle` when the
    /// sibling is absent.
    pub fn sibling_state(&self) -> BgState {
        self.sibling
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(BgState::Idle)
    }
}
