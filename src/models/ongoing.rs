use serde::{Deserialize, Serialize};

use crate::models::round::Round;

/// A candidate currently sitting with a panelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OngoingInterview {
    pub candidate_id: String,
    pub candidate_name: String,
    pub panel_id: String,
    pub panel_name: String,
    pub round: Round,
}
