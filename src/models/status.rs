use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome recorded for a candidate, distinct from the round they are in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FinalStatus {
    #[default]
    Unassigned,
    Assigned,
    Selected,
    Rejected,
    OnHold,
    Hired,
    OfferReleased,
    CandidateDeclined,
    Joined,
    /// Any status the store knows about that this engine does not classify.
    Other(String),
}

impl FinalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FinalStatus::Unassigned => "unassigned",
            FinalStatus::Assigned => "assigned",
            FinalStatus::Selected => "selected",
            FinalStatus::Rejected => "rejected",
            FinalStatus::OnHold => "on-hold",
            FinalStatus::Hired => "hired",
            FinalStatus::OfferReleased => "offerReleased",
            FinalStatus::CandidateDeclined => "candidateDeclined",
            FinalStatus::Joined => "joined",
            FinalStatus::Other(raw) => raw.as_str(),
        }
    }

    pub fn parse(raw: &str) -> FinalStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "unassigned" => FinalStatus::Unassigned,
            "assigned" => FinalStatus::Assigned,
            "selected" => FinalStatus::Selected,
            "rejected" => FinalStatus::Rejected,
            "on-hold" | "on_hold" | "onhold" => FinalStatus::OnHold,
            "hired" => FinalStatus::Hired,
            "offerreleased" | "offer_released" => FinalStatus::OfferReleased,
            "candidatedeclined" | "candidate_declined" => FinalStatus::CandidateDeclined,
            "joined" => FinalStatus::Joined,
            _ => FinalStatus::Other(raw.trim().to_string()),
        }
    }

    /// Outcomes that close the pipeline once the candidate has reached r3.
    pub fn is_completion_outcome(&self) -> bool {
        matches!(
            self,
            FinalStatus::Selected
                | FinalStatus::Rejected
                | FinalStatus::OnHold
                | FinalStatus::Hired
                | FinalStatus::OfferReleased
                | FinalStatus::CandidateDeclined
                | FinalStatus::Joined
        )
    }

    /// A round outcome after which the candidate may be sent to the next round.
    pub fn allows_promotion(&self) -> bool {
        matches!(self, FinalStatus::Selected | FinalStatus::OnHold)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinalStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinalStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(FinalStatus::parse).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_spellings() {
        assert_eq!(FinalStatus::parse("offerReleased"), FinalStatus::OfferReleased);
        assert_eq!(FinalStatus::parse("ON-HOLD"), FinalStatus::OnHold);
        assert_eq!(FinalStatus::parse("Rejected"), FinalStatus::Rejected);
        assert_eq!(
            FinalStatus::parse("in-review"),
            FinalStatus::Other("in-review".to_string())
        );
    }

    #[test]
    fn unknown_status_survives_a_round_trip_through_json() {
        let status: FinalStatus = serde_json::from_str(r#""in-review""#).unwrap();
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""in-review""#);
    }
}
