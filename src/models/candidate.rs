use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::models::round::Round;
use crate::models::status::FinalStatus;

fn deserialize_experience<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Int(i64),
        Float(f64),
        String(String),
    }

    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Int(i)) => Some(i.to_string()),
        Some(NumberOrString::Float(f)) => Some(f.to_string()),
        Some(NumberOrString::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub skill: String,
    pub score: f64,
}

/// Outcome of one completed interview round. Only ever appended to a
/// candidate's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: Round,
    pub status: FinalStatus,
    #[serde(default)]
    pub feedback_submitted: bool,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub panel_name: Option<String>,
    #[serde(default)]
    pub skill_scores: Vec<SkillScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub applied_position: String,
    #[serde(default, rename = "vacancyId")]
    pub vacancy_id: Option<String>,
    #[serde(default)]
    pub skill_set: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_experience")]
    pub total_experience: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub recruiter_name: Option<String>,
    #[serde(default)]
    pub interview_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub final_status: FinalStatus,
    #[serde(default)]
    pub last_interview_round: Round,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub wait_duration_minutes: u64,
    #[serde(default)]
    pub panel_name: Option<String>,
    #[serde(default)]
    pub previous_rounds: Vec<RoundRecord>,
}

impl Candidate {
    pub fn has_vacancy(&self) -> bool {
        self.vacancy_id
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    /// Parsed `total_experience`, `None` when missing or not a number.
    pub fn experience_years(&self) -> Option<Decimal> {
        self.total_experience
            .as_deref()
            .and_then(|raw| Decimal::from_str(raw.trim()).ok())
    }

    pub fn has_active_assignment(&self) -> bool {
        self.final_status == FinalStatus::Assigned
    }

    /// Finished candidates: an outcome recorded at r3, a rejection at any
    /// round, or anyone already past r3.
    pub fn is_completed(&self) -> bool {
        if self.final_status == FinalStatus::Rejected || self.last_interview_round == Round::Final {
            return true;
        }
        self.last_interview_round == Round::R3 && self.final_status.is_completion_outcome()
    }

    /// Appends a round outcome and takes its status as the current one.
    pub fn append_round(&mut self, record: RoundRecord) {
        self.final_status = record.status.clone();
        if record.panel_name.is_some() {
            self.panel_name = record.panel_name.clone();
        }
        self.previous_rounds.push(record);
    }
}

/// Partial update sent to the store; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<FinalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_rounds: Option<Vec<RoundRecord>>,
}

impl CandidatePatch {
    pub fn status(status: FinalStatus) -> Self {
        Self {
            final_status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, candidate: &mut Candidate) {
        if let Some(status) = &self.final_status {
            candidate.final_status = status.clone();
        }
        if let Some(panel_name) = &self.panel_name {
            candidate.panel_name = Some(panel_name.clone());
        }
        if let Some(rounds) = &self.previous_rounds {
            candidate.previous_rounds = rounds.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCandidatesResponse {
    pub deleted_count: u64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(value: serde_json::Value) -> Candidate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn experience_accepts_numbers_and_strings() {
        let c = candidate(json!({"id": "1", "name": "A", "email": "a@x.io", "total_experience": 4}));
        assert_eq!(c.experience_years(), Some(Decimal::from(4)));

        let c = candidate(json!({"id": "1", "name": "A", "email": "a@x.io", "total_experience": "10.5"}));
        assert_eq!(c.experience_years(), Decimal::from_str("10.5").ok());

        let c = candidate(json!({"id": "1", "name": "A", "email": "a@x.io", "total_experience": "n/a"}));
        assert_eq!(c.experience_years(), None);
    }

    #[test]
    fn rejection_completes_at_any_round() {
        let mut c = candidate(json!({
            "id": "1", "name": "A", "email": "a@x.io",
            "final_status": "rejected", "last_interview_round": "r1"
        }));
        assert!(c.is_completed());

        c.final_status = FinalStatus::Selected;
        assert!(!c.is_completed());
        c.last_interview_round = Round::R3;
        assert!(c.is_completed());
    }

    #[test]
    fn final_round_is_past_the_pipeline() {
        let c = candidate(json!({
            "id": "1", "name": "A", "email": "a@x.io",
            "final_status": "selected", "last_interview_round": "final"
        }));
        assert!(c.is_completed());
    }

    #[test]
    fn append_round_keeps_history_and_updates_status() {
        let mut c = candidate(json!({"id": "1", "name": "A", "email": "a@x.io", "final_status": "assigned"}));
        let first = RoundRecord {
            round: Round::R1,
            status: FinalStatus::Selected,
            feedback_submitted: true,
            rating: Some(4.0),
            feedback: Some("solid".into()),
            panel_name: Some("Priya".into()),
            skill_scores: vec![],
        };
        c.append_round(first.clone());
        assert_eq!(c.previous_rounds, vec![first]);
        assert_eq!(c.final_status, FinalStatus::Selected);
        assert_eq!(c.panel_name.as_deref(), Some("Priya"));
    }
}
