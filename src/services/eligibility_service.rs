use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::panel::Panel;
use crate::models::round::Round;
use crate::models::status::FinalStatus;
use crate::services::store_service::CandidateStore;

#[derive(Clone)]
pub struct EligibilityService {
    store: Arc<dyn CandidateStore>,
}

impl EligibilityService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    /// Panelists who may take `candidate` for `round`.
    ///
    /// A candidate selected at r2 goes to a manager round: only free managers
    /// qualify and the vacancy-scoped list is skipped. Everyone else gets the
    /// store's vacancy-scoped, skill-matched list.
    pub async fn eligible_panels(&self, candidate: &Candidate, round: Round) -> Result<Vec<Panel>> {
        if !candidate.has_vacancy() {
            return Err(Error::EligibilityFetch(format!(
                "candidate {} is not linked to a vacancy",
                candidate.id
            )));
        }
        let vacancy_id = candidate.vacancy_id.as_deref().unwrap_or_default().trim();

        if !round.is_schedulable() {
            return Err(Error::Precondition(format!(
                "round '{}' cannot be scheduled",
                round
            )));
        }

        if requires_manager_round(candidate) {
            debug!(candidate_id = %candidate.id, %round, "Resolving manager round panelists");
            let panels = self.store.fetch_panels().await?;
            return Ok(panels.into_iter().filter(Panel::is_free_manager).collect());
        }

        debug!(candidate_id = %candidate.id, vacancy_id, %round, "Resolving vacancy panelists");
        self.store.eligible_panels(&candidate.id, vacancy_id).await
    }
}

pub fn requires_manager_round(candidate: &Candidate) -> bool {
    candidate.final_status == FinalStatus::Selected && candidate.last_interview_round == Round::R2
}
