use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::round::Round;
use crate::services::projection_service::{
    CandidateFilter, DateFilter, ExperienceBucket, ProjectionKind, SourceFilter,
};

/// Query string of `GET /api/pipeline/projections`. Empty values and `all`
/// leave a criterion inactive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectionQuery {
    pub search: Option<String>,
    pub job: Option<String>,
    pub status: Option<String>,
    pub experience: Option<String>,
    pub source: Option<String>,
    pub round: Option<String>,
    pub interview_type: Option<String>,
    pub date: Option<String>,
    pub unassigned_page: Option<usize>,
    pub assigned_page: Option<usize>,
    pub completed_page: Option<usize>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ProjectionQuery {
    pub fn filter(&self) -> Result<CandidateFilter> {
        let round = parse_round(active(&self.round))?;

        Ok(CandidateFilter {
            search: active(&self.search).map(str::to_string),
            job: active(&self.job).map(str::to_string),
            status: active(&self.status).map(str::to_string),
            experience: active(&self.experience)
                .map(ExperienceBucket::parse)
                .transpose()?,
            source: active(&self.source).map(SourceFilter::parse),
            round,
            interview_type: active(&self.interview_type).map(str::to_string),
            date: active(&self.date).map(DateFilter::parse).transpose()?,
        })
    }

    pub fn pages(&self) -> [(ProjectionKind, Option<usize>); 3] {
        [
            (ProjectionKind::Unassigned, self.unassigned_page),
            (ProjectionKind::Assigned, self.assigned_page),
            (ProjectionKind::Completed, self.completed_page),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInPayload {
    pub checked_in: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignPayload {
    #[validate(length(min = 1))]
    pub panel_id: String,
    /// Defaults to the round after the candidate's last one.
    pub round: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UndoPayload {
    #[validate(length(min = 1))]
    pub panel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StatusPayload {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeletePayload {
    #[validate(length(min = 1))]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EligiblePanelsQuery {
    pub round: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssigningResponse {
    pub candidate_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A missing or blank round means none was given; anything else must parse.
pub fn parse_round(raw: Option<&str>) -> Result<Option<Round>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => Round::parse(raw)
            .map(Some)
            .ok_or_else(|| Error::BadRequest(format!("Unknown round: {}", raw))),
    }
}
