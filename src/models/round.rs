use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Position of a candidate in the interview sequence.
///
/// `None` is the empty round of a fresh candidate, `Final` is the terminal
/// marker produced after `R3` and is never scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Round {
    #[default]
    None,
    R1,
    R2,
    R3,
    Final,
}

impl Round {
    pub fn as_str(&self) -> &'static str {
        match self {
            Round::None => "",
            Round::R1 => "r1",
            Round::R2 => "r2",
            Round::R3 => "r3",
            Round::Final => "final",
        }
    }

    /// Case-insensitive parse. Returns `None` for unrecognized input.
    pub fn parse(raw: &str) -> Option<Round> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Round::None),
            "r1" => Some(Round::R1),
            "r2" => Some(Round::R2),
            "r3" => Some(Round::R3),
            "final" => Some(Round::Final),
            _ => None,
        }
    }

    /// Whether a panelist can be assigned for this round.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Round::R1 | Round::R2 | Round::R3)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Round {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// Stores send `null`, `""` or mixed-case round names; anything unknown is
// read as the empty round.
impl<'de> Deserialize<'de> for Round {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Round::parse).unwrap_or_default())
    }
}
