//! Message-level action enablement
//!
//! An action specification is `none`, `all`, or a comma separated subset of
//! `copy, feedback, regenerate, share, more`. A per-message value overrides
//! the container default.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One action that can be offered on a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Copy,
    Feedback,
    Regenerate,
    Share,
    More,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Copy,
        ActionKind::Feedback,
        ActionKind::Regenerate,
        ActionKind::Share,
        ActionKind::More,
    ];

    fn bit(self) -> u8 {
        match self {
            ActionKind::Copy => 1,
            ActionKind::Feedback => 1 << 1,
            ActionKind::Regenerate => 1 << 2,
            ActionKind::Share => 1 << 3,
            ActionKind::More => 1 << 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Copy => "copy",
            ActionKind::Feedback => "feedback",
            ActionKind::Regenerate => "regenerate",
            ActionKind::Share => "share",
            ActionKind::More => "more",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved set of actions enabled on a single message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ActionKind>", into = "Vec<ActionKind>")]
pub struct ActionSet(u8);

impl ActionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        ActionKind::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, kind: ActionKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL.into_iter().filter(|kind| self.contains(*kind))
    }
}

impl FromIterator<ActionKind> for ActionSet {
    fn from_iter<I: IntoIterator<Item = ActionKind>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<ActionKind>> for ActionSet {
    fn from(kinds: Vec<ActionKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<ActionSet> for Vec<ActionKind> {
    fn from(set: ActionSet) -> Self {
        set.iter().collect()
    }
}

/// Unresolved enablement, as written in configuration or on a message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionSpec {
    #[default]
    None,
    All,
    Only(ActionSet),
}

impl ActionSpec {
    /// Parse a specification; unknown action names are skipped
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return ActionSpec::None;
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return ActionSpec::All;
        }

        let mut set = ActionSet::empty();
        for name in trimmed.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match ActionKind::parse(name) {
                Some(kind) => set.insert(kind),
                None => warn!(action = name, "ignoring unknown message action"),
            }
        }
        ActionSpec::Only(set)
    }

    pub fn resolve(&self) -> ActionSet {
        match self {
            ActionSpec::None => ActionSet::empty(),
            ActionSpec::All => ActionSet::all(),
            ActionSpec::Only(set) => *set,
        }
    }
}

impl From<String> for ActionSpec {
    fn from(raw: String) -> Self {
        ActionSpec::parse(&raw)
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSpec::None => f.write_str("none"),
            ActionSpec::All => f.write_str("all"),
            ActionSpec::Only(set) => {
                let names: Vec<&str> = set.iter().map(ActionKind::as_str).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

impl From<ActionSpec> for String {
    fn from(spec: ActionSpec) -> Self {
        spec.to_string()
    }
}
