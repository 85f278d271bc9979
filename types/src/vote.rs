use serde::{Deserialize, Serialize};

/// A ballot's vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Vote {
    /// No vote cast yet.
    #[default]
    Unspecified,
    Yes,
    No,
}

impl Vote {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Vote::Unspecified => "unspecified",
            Vote::Yes => "yes",
            Vote::No => "no",
        }
    }

    #[must_use]
    pub fn is_cast(self) -> bool {
        self != Vote::Unspecified
    }
}
