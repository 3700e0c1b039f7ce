//! Consumer-group id codec.
//!
//! Three shapes share one Kafka cluster:
//!
//! - plain ids owned by third parties (`payment-processors`)
//! - the current versioned scheme
//!   (`{prefix}-{version}-{state}_{siblingState}-{YYYY-MM-DD_HH-MM-SS}`,
//!   timestamp in UTC)
//! - the legacy first-generation scheme
//!   (`{prefix}-{version}{bgVersion}{stage}{unixSeconds}`), where stage `M`
//!   marks a completed offset migration
//!
//! Parsing is total: a string matching neither structured grammar is a plain
//! id, never an error. These strings are the committed identity of the group
//! on the cluster and external tooling inspects them, so formatting must be
//! bit-exact.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::state::{BgState, Version};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn versioned_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<prefix>.+)-(?P<version>v\d+)-(?P<state>[acli])_(?P<sibling>[acli])-(?P<ts>\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})$",
        )
        .unwrap_or_else(|_| unreachable!())
    })
}

fn bg1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<prefix>.+)-(?P<version>v\d+)(?P<bg>v\d+)(?P<stage>[acliM])(?P<ts>\d{10})$")
            .unwrap_or_else(|_| unreachable!())
    })
}

/// Stage code of a first-generation versioned group.
///
/// The lifecycle codes mirror [`BgState`]; `Migrated` is the marker stage
/// recording that legacy offsets were carried into the current scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bg1Stage {
    Active,
    Candidate,
    Legacy,
    Idle,
    Migrated,
}

impl Bg1Stage {
    pub fn code(&self) -> char {
        match self {
            Bg1Stage::Active => 'a',
            Bg1Stage::Candidate => 'c',
            Bg1Stage::Legacy => 'l',
            Bg1Stage::Idle => 'i',
            Bg1Stage::Migrated => 'M',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'a' => Some(Bg1Stage::Active),
            'c' => Some(Bg1Stage::Candidate),
            'l' => Some(Bg1Stage::Legacy),
            'i' => Some(Bg1Stage::Idle),
            'M' => Some(Bg1Stage::Migrated),
            _ => None,
        }
    }
}

/// A parsed consumer-group id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupId {
    /// Any id matching neither structured grammar.
    Plain { name: String },

    /// Current naming scheme: version, both state codes and a UTC timestamp.
    Versioned {
        prefix: String,
        version: Version,
        state: BgState,
        sibling_state: BgState,
        updated: DateTime<Utc>,
    },

    /// Legacy first-generation scheme with a unix-seconds tail.
    Bg1Versioned {
        prefix: String,
        version: Version,
        bg_version: Version,
        stage: Bg1Stage,
        updated: DateTime<Utc>,
    },
}

impl GroupId {
    /// Parse a group id. Total: unrecognized shapes come back as `Plain`.
    pub fn parse(name: &str) -> Self {
        if let Some(caps) = versioned_pattern().captures(name) {
            let version = Version::parse(&caps["version"]);
            let state = caps["state"].chars().next().and_then(BgState::from_code);
            let sibling = caps["sibling"].chars().next().and_then(BgState::from_code);
            let updated = NaiveDateTime::parse_from_str(&caps["ts"], TIMESTAMP_FORMAT)
                .map(|naive| naive.and_utc());
            if let (Ok(version), Some(state), Some(sibling_state), Ok(updated)) =
                (version, state, sibling, updated)
            {
                return GroupId::Versioned {
                    prefix: caps["prefix"].to_string(),
                    version,
                    state,
                    sibling_state,
                    updated,
                };
            }
        }
        if let Some(caps) = bg1_pattern().captures(name) {
            let version = Version::parse(&caps["version"]);
            let bg_version = Version::parse(&caps["bg"]);
            let stage = caps["stage"].chars().next().and_then(Bg1Stage::from_code);
            let updated = caps["ts"]
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            if let (Ok(version), Ok(bg_version), Some(stage), Some(updated)) =
                (version, bg_version, stage, updated)
            {
                return GroupId::Bg1Versioned {
                    prefix: caps["prefix"].to_string(),
                    version,
                    bg_version,
                    stage,
                    updated,
                };
            }
        }
        GroupId::Plain {
            name: name.to_string(),
        }
    }

    /// Build a versioned id for a fresh state epoch. The timestamp is
    /// truncated to whole seconds so the id round-trips through [`parse`].
    ///
    /// [`parse`]: GroupId::parse
    pub fn versioned(
        prefix: impl Into<String>,
        version: Version,
        state: BgState,
        sibling_state: BgState,
        updated: DateTime<Utc>,
    ) -> Self {
        let truncated = DateTime::from_timestamp(updated.timestamp(), 0).unwrap_or(updated);
        GroupId::Versioned {
            prefix: prefix.into(),
            version,
            state,
            sibling_state,
            updated: truncated,
        }
    }

    /// The shared prefix this id belongs to. Plain ids are their own prefix.
    pub fn prefix(&self) -> &str {
        match self {
            GroupId::Plain { name } => name,
            GroupId::Versioned { prefix, .. } => prefix,
            GroupId::Bg1Versioned { prefix, .. } => prefix,
        }
    }

    /// Deployment version encoded in the id, if any.
    pub fn version(&self) -> Option<&Version> {
        match self {
            GroupId::Plain { .. } => None,
            GroupId::Versioned { version, .. } => Some(version),
            GroupId::Bg1Versioned { version, .. } => Some(version),
        }
    }

    /// Timestamp encoded in the id, if any.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        match self {
            GroupId::Plain { .. } => None,
            GroupId::Versioned { updated, .. } => Some(*updated),
            GroupId::Bg1Versioned { updated, .. } => Some(*updated),
        }
    }

    pub fn is_bg1(&self) -> bool {
        matches!(self, GroupId::Bg1Versioned { .. })
    }

    /// A legacy id other than the migration marker.
    pub fn is_unmigrated_bg1(&self) -> bool {
        matches!(
            self,
            GroupId::Bg1Versioned { stage, .. } if *stage != Bg1Stage::Migrated
        )
    }

    pub fn is_migration_marker(&self) -> bool {
        matches!(
            self,
            GroupId::Bg1Versioned { stage, .. } if *stage == Bg1Stage::Migrated
        )
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Plain { name } => f.write_str(name),
            GroupId::Versioned {
                prefix,
                version,
                state,
                sibling_state,
                updated,
            } => write!(
                f,
                "{}-{}-{}_{}-{}",
                prefix,
                version,
                state.code(),
                sibling_state.code(),
                format_timestamp(*updated)
            ),
            GroupId::Bg1Versioned {
                prefix,
                version,
                bg_version,
                stage,
                updated,
            } => write!(
                f,
                "{}-{}{}{}{}",
                prefix,
                version,
                bg_version,
                stage.code(),
                updated.timestamp()
            ),
        }
    }
}

/// Render a UTC instant in the group-id timestamp format.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Whether `group` is a versioned id carrying exactly this state pair.
///
/// `None`, plain and legacy ids all answer `false`; the corrector iterates
/// over mixed shapes and relies on that.
pub fn compare_group_states(
    group: Option<&GroupId>,
    state: BgState,
    sibling_state: BgState,
) -> bool {
    match group {
        Some(GroupId::Versioned {
            state: got_state,
            sibling_state: got_sibling,
            ..
        }) => *got_state == state && *got_sibling == sibling_state,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn plain_group_prefix_is_itself() {
        let group = GroupId::parse("plain-group");
        assert_eq!(group.prefix(), "plain-group");
        assert_eq!(group.to_string(), "plain-group");
        assert!(matches!(group, GroupId::Plain { .. }));
    }

    #[test]
    fn versioned_group_parses_all_fields() {
        let group = GroupId::parse("test-v1-a_i-2023-07-07_10-30-00");
        assert_eq!(
            group,
            GroupId::Versioned {
                prefix: "test".to_string(),
                version: Version::parse("v1").unwrap(),
                state: BgState::Active,
                sibling_state: BgState::Idle,
                updated: utc(2023, 7, 7, 10, 30, 0),
            }
        );
        assert_eq!(group.prefix(), "test");
        assert_eq!(group.to_string(), "test-v1-a_i-2023-07-07_10-30-00");
    }

    #[test]
    fn versioned_group_keeps_dashed_prefix() {
        let group = GroupId::parse("test-with-suffix-v1-a_i-2023-07-07_10-30-00");
        assert_eq!(group.prefix(), "test-with-suffix");
    }

    #[test]
    fn bg1_group_parses_all_fields() {
        let updated = utc(2024, 9, 3, 12, 7, 58);
        let name = format!("groupA-v5v8a{}", updated.timestamp());
        let group = GroupId::parse(&name);
        assert_eq!(
            group,
            GroupId::Bg1Versioned {
                prefix: "groupA".to_string(),
                version: Version::parse("v5").unwrap(),
                bg_version: Version::parse("v8").unwrap(),
                stage: Bg1Stage::Active,
                updated,
            }
        );
        assert_eq!(group.to_string(), name);
    }

    #[test]
    fn bg1_marker_stage_is_recognized() {
        let group = GroupId::parse("test-v1v2M1759926089");
        assert!(group.is_migration_marker());
        assert!(!group.is_unmigrated_bg1());

        let live = GroupId::parse("test-v1v2a1725365278");
        assert!(live.is_unmigrated_bg1());
        assert!(!live.is_migration_marker());
    }

    #[test]
    fn structured_ids_round_trip() {
        let ids = [
            "orders-v1-a_c-2023-07-07_10-30-00",
            "orders-v2-c_a-2025-01-02_03-04-05",
            "test-with-suffix-v1-l_a-2023-12-31_23-59-59",
            "test-v1v2a1725365278",
            "test-v1v2M1759926089",
            "groupA-v12v3l1735787045",
        ];
        for id in ids {
            let parsed = GroupId::parse(id);
            assert!(!matches!(parsed, GroupId::Plain { .. }), "{id} fell back to plain");
            assert_eq!(GroupId::parse(&parsed.to_string()), parsed, "{id}");
        }
    }

    #[test]
    fn unparseable_strings_become_plain() {
        for name in [
            "",
            "test",
            "test-v1",
            "test-v1-x_i-2023-07-07_10-30-00",
            "test-v1v2z1725365278",
            "test-v1v2a999",
            "-v1-a_i-2023-07-07_10-30-00",
        ] {
            let parsed = GroupId::parse(name);
            assert_eq!(
                parsed,
                GroupId::Plain {
                    name: name.to_string()
                },
                "{name:?} should be plain"
            );
        }
    }

    #[test]
    fn formats_timestamps_in_utc() {
        assert_eq!(
            format_timestamp(utc(2023, 7, 7, 10, 30, 0)),
            "2023-07-07_10-30-00"
        );
    }

    #[test]
    fn versioned_constructor_truncates_to_seconds() {
        let precise = utc(2023, 7, 7, 10, 30, 0) + chrono::Duration::milliseconds(450);
        let group = GroupId::versioned(
            "test",
            Version::parse("v1").unwrap(),
            BgState::Active,
            BgState::Idle,
            precise,
        );
        assert_eq!(GroupId::parse(&group.to_string()), group);
    }

    #[test]
    fn compare_group_states_matches_only_versioned() {
        let versioned = GroupId::parse("test-v1-a_c-2023-07-07_10-30-00");
        assert!(compare_group_states(
            Some(&versioned),
            BgState::Active,
            BgState::Candidate
        ));
        assert!(!compare_group_states(
            Some(&versioned),
            BgState::Candidate,
            BgState::Active
        ));

        let plain = GroupId::parse("plain-group");
        assert!(!compare_group_states(
            Some(&plain),
            BgState::Active,
            BgState::Candidate
        ));

        let bg1 = GroupId::parse("test-v1v2a1725365278");
        assert!(!compare_group_states(
            Some(&bg1),
            BgState::Active,
            BgState::Candidate
        ));

        assert!(!compare_group_states(None, BgState::Active, BgState::Idle));
    }
}
