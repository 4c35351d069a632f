use serde::{Deserialize, Serialize};

/// Kind of installable item a matcher speaks for.
///
/// Decides which invocation phrasing the directive uses for a matched item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Skill,
    Agent,
    Command,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Skill, Self::Agent, Self::Command];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Agent => "agent",
            Self::Command => "command",
        }
    }

    /// Parse the wire name of a category. Matching is exact.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
