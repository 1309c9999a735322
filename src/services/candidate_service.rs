use std::collections::HashSet;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidatePatch, RoundRecord};
use crate::models::status::FinalStatus;
use crate::services::collection_service::CollectionService;
use crate::services::event_service::{PipelineEvent, ToastKind};
use crate::services::reconcile_service::OptimisticMutation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
    pub deleted_count: usize,
    pub failed_count: usize,
}

/// Status changes, round feedback and deletion for candidates already in
/// the pipeline.
#[derive(Clone)]
pub struct CandidateService {
    collections: CollectionService,
}

impl CandidateService {
    pub fn new(collections: CollectionService) -> Self {
        Self { collections }
    }

    async fn candidate(&self, id: &str) -> Result<Candidate> {
        self.collections
            .find(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }

    pub async fn change_status(&self, id: &str, status: FinalStatus) -> Result<Candidate> {
        let result: Result<Candidate> = async {
            self.candidate(id).await?;
            let patch = CandidatePatch::status(status.clone());
            let updated = self.apply_optimistically("Status change", id, patch).await?;
            info!(candidate_id = id, status = %status, "Candidate status changed");
            self.collections.events().publish(PipelineEvent::StatusChanged {
                candidate_id: id.to_string(),
                status,
            });
            Ok(updated)
        }
        .await;
        self.collections.events().report("Status change", result)
    }

    /// Appends the outcome of the candidate's current round to their history.
    pub async fn record_round(&self, id: &str, record: RoundRecord) -> Result<Candidate> {
        let result: Result<Candidate> = async {
            let current = self.candidate(id).await?;
            if !record.round.is_schedulable() || record.round != current.last_interview_round {
                return Err(Error::Precondition(format!(
                    "candidate {} is in round '{}', feedback was for '{}'",
                    id, current.last_interview_round, record.round
                )));
            }

            let round = record.round;
            let mut next = current.clone();
            next.append_round(record);
            let patch = CandidatePatch {
                final_status: Some(next.final_status.clone()),
                panel_name: next.panel_name.clone(),
                previous_rounds: Some(next.previous_rounds.clone()),
            };

            let updated = self.apply_optimistically("Round feedback", id, patch).await?;
            self.collections.events().publish(PipelineEvent::RoundRecorded {
                candidate_id: id.to_string(),
                round,
            });
            Ok(updated)
        }
        .await;
        self.collections.events().report("Round feedback", result)
    }

    async fn apply_optimistically(
        &self,
        operation: &str,
        id: &str,
        patch: CandidatePatch,
    ) -> Result<Candidate> {
        let store = self.collections.store().clone();
        let remote_patch = patch.clone();
        OptimisticMutation::new(&self.collections, operation)
            .run(
                |c| {
                    c.patch_candidate(id, |candidate| patch.apply_to(candidate));
                },
                || async move { store.update_candidate(id, &remote_patch).await },
            )
            .await
    }

    /// Deletes each id separately so a partial failure is reported per id.
    /// Only ids the store confirmed are dropped from local state.
    pub async fn delete_candidates(&self, ids: Vec<String>) -> Result<DeleteReport> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if ids.is_empty() {
            return self
                .collections
                .events()
                .report("Delete candidates", Err(Error::BadRequest("No candidate ids given".into())));
        }

        let store = self.collections.store().clone();
        let outcomes = join_all(ids.iter().map(|id| {
            let store = store.clone();
            async move {
                let result = store.delete_candidates(std::slice::from_ref(id)).await;
                (id.clone(), result)
            }
        }))
        .await;

        let mut report = DeleteReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(resp) if resp.deleted_count > 0 => report.deleted.push(id),
                Ok(resp) => report.failed.push(DeleteFailure {
                    id,
                    error: if resp.message.is_empty() {
                        "not deleted".to_string()
                    } else {
                        resp.message
                    },
                }),
                Err(e) => {
                    warn!(candidate_id = %id, error = %e, "Candidate delete failed");
                    report.failed.push(DeleteFailure {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.deleted_count = report.deleted.len();
        report.failed_count = report.failed.len();

        let confirmed: HashSet<String> = report.deleted.iter().cloned().collect();
        self.collections.update(|c| c.remove(&confirmed)).await;

        info!(
            deleted = report.deleted_count,
            failed = report.failed_count,
            "Candidate delete finished"
        );
        let kind = if report.failed_count == 0 {
            ToastKind::Success
        } else {
            ToastKind::Error
        };
        self.collections.events().toast(
            kind,
            format!(
                "Deleted {} candidate(s), {} failed",
                report.deleted_count, report.failed_count
            ),
        );
        if !report.deleted.is_empty() {
            self.collections.events().publish(PipelineEvent::CandidatesDeleted {
                ids: report.deleted.clone(),
            });
        }
        Ok(report)
    }
}
