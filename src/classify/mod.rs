//! Role assignment: a learned model predicts a role for every line, then an
//! ordered rule list re-derives the final role.

pub mod model;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::config::HeuristicConfig;
use crate::error::{OutlineError, Result};
use crate::features::FeaturedLine;
use crate::logging::OUTLINE_CLASSIFY;

pub use model::{ModelStore, RoleModel};

/// Structural role of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Title,
    H1,
    H2,
    H3,
    H4,
    BodyText,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Title,
        Role::H1,
        Role::H2,
        Role::H3,
        Role::H4,
        Role::BodyText,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Title => "Title",
            Role::H1 => "H1",
            Role::H2 => "H2",
            Role::H3 => "H3",
            Role::H4 => "H4",
            Role::BodyText => "Body Text",
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Role::H1 | Role::H2 | Role::H3 | Role::H4)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = OutlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Title" => Ok(Role::Title),
            "H1" => Ok(Role::H1),
            "H2" => Ok(Role::H2),
            "H3" => Ok(Role::H3),
            "H4" => Ok(Role::H4),
            "Body Text" | "BodyText" => Ok(Role::BodyText),
            other => Err(OutlineError::Model(format!("unknown role label '{}'", other))),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// A line after both classification stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedLine {
    pub line: FeaturedLine,
    /// Role returned by the learned model.
    pub predicted: Role,
    /// Final role after the rule overlay.
    pub role: Role,
    /// Name of the rule that decided `role`.
    pub rule: &'static str,
}

impl ClassifiedLine {
    pub fn text(&self) -> &str {
        self.line.text()
    }

    pub fn page_number(&self) -> u32 {
        self.line.page_number()
    }
}

/// Run the learned stage and the rule overlay over every line.
///
/// Any model failure aborts the whole document; there is no rules-only mode.
pub fn classify(
    lines: Vec<FeaturedLine>,
    model: &dyn RoleModel,
    config: &HeuristicConfig,
) -> Result<Vec<ClassifiedLine>> {
    let keys = model.feature_keys();
    lines
        .into_iter()
        .map(|line| {
            let vector = line.features.to_vector(keys);
            let predicted = model.predict(&vector)?;
            let (rule, role) = rules::evaluate(&line, config);
            if predicted != role {
                trace!(
                    target: OUTLINE_CLASSIFY,
                    text = %line.text(),
                    %predicted,
                    %role,
                    rule,
                    "Rule overlay changed role"
                );
            }
            Ok(ClassifiedLine {
                line,
                predicted,
                role,
                rule,
            })
        })
        .collect()
}
