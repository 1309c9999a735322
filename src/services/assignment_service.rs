use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::panel::Panel;
use crate::models::round::Round;
use crate::services::collection_service::CollectionService;
use crate::services::eligibility_service::EligibilityService;
use crate::services::event_service::{PipelineEvent, ToastKind};
use crate::services::reconcile_service::ConservativeMutation;
use crate::services::round_service::successor;
use crate::utils::time::now;

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Marks a candidate as having an assignment call in flight until dropped.
struct InFlightGuard {
    set: InFlightSet,
    candidate_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|p| p.into_inner());
        set.remove(&self.candidate_id);
    }
}

/// Entry point for binding candidates to panelists and for check-in.
#[derive(Clone)]
pub struct AssignmentCoordinator {
    collections: CollectionService,
    eligibility: EligibilityService,
    in_flight: InFlightSet,
}

impl AssignmentCoordinator {
    pub fn new(collections: CollectionService, eligibility: EligibilityService) -> Self {
        Self {
            collections,
            eligibility,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Candidates with an assign or undo call currently running.
    pub fn assigning(&self) -> Vec<String> {
        let set = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        let mut ids: Vec<String> = set.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_assigning(&self, candidate_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(candidate_id)
    }

    fn begin(&self, candidate_id: &str) -> Result<InFlightGuard> {
        let mut set = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if !set.insert(candidate_id.to_string()) {
            return Err(Error::InFlight(candidate_id.to_string()));
        }
        Ok(InFlightGuard {
            set: self.in_flight.clone(),
            candidate_id: candidate_id.to_string(),
        })
    }

    /// Reloads before acting on collections the store has moved past.
    async fn ensure_fresh(&self) -> Result<()> {
        if self.collections.is_stale() {
            info!("Collections are stale, reloading before the next assignment call");
            self.collections
                .refresh()
                .await
                .map_err(|e| Error::Stale(e.to_string()))?;
        }
        Ok(())
    }

    async fn candidate(&self, candidate_id: &str) -> Result<Candidate> {
        self.collections
            .find(candidate_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }

    pub async fn eligible_panels(&self, candidate_id: &str, round: Option<Round>) -> Result<Vec<Panel>> {
        let result: Result<Vec<Panel>> = async {
            let candidate = self.candidate(candidate_id).await?;
            let round = round.unwrap_or_else(|| successor(candidate.last_interview_round));
            self.eligibility.eligible_panels(&candidate, round).await
        }
        .await;
        self.collections.events().report("Load eligible panels", result)
    }

    /// Binds a candidate to a panelist for `round`. The store is the source
    /// of truth: local state only changes through the refresh that follows
    /// a confirmed assignment.
    pub async fn assign(
        &self,
        candidate_id: &str,
        panel_id: &str,
        round: Round,
        assigned_by: &str,
    ) -> Result<()> {
        let result = self.try_assign(candidate_id, panel_id, round, assigned_by).await;
        self.collections.events().report("Assign candidate", result)
    }

    async fn try_assign(
        &self,
        candidate_id: &str,
        panel_id: &str,
        round: Round,
        assigned_by: &str,
    ) -> Result<()> {
        if assigned_by.trim().is_empty() {
            return Err(Error::Precondition("assigning user is unknown".to_string()));
        }
        if panel_id.trim().is_empty() {
            return Err(Error::Precondition("panel id is required".to_string()));
        }
        self.ensure_fresh().await?;
        let candidate = self.candidate(candidate_id).await?;
        check_assignable(&candidate, round)?;

        let _guard = self.begin(candidate_id)?;
        info!(candidate_id, panel_id, %round, assigned_by, "Assigning candidate");

        let store = self.collections.store().clone();
        ConservativeMutation::new(&self.collections, "Assign candidate")
            .run(|| async move { store.assign(candidate_id, panel_id, round, assigned_by).await })
            .await?;

        self.collections.events().publish(PipelineEvent::AssignmentChanged {
            candidate_id: candidate_id.to_string(),
            panel_id: panel_id.to_string(),
            round: Some(round),
        });
        self.collections.events().toast(
            ToastKind::Success,
            format!("{} assigned for round {}", candidate.name, round),
        );
        Ok(())
    }

    /// Releases a candidate from a panelist. Undoing a pair that has no
    /// active assignment succeeds without doing anything.
    pub async fn undo(&self, candidate_id: &str, panel_id: &str) -> Result<()> {
        let result = self.try_undo(candidate_id, panel_id).await;
        self.collections.events().report("Undo assignment", result)
    }

    async fn try_undo(&self, candidate_id: &str, panel_id: &str) -> Result<()> {
        let _guard = self.begin(candidate_id)?;
        self.ensure_fresh().await?;

        let active = self
            .collections
            .snapshot()
            .await
            .has_active_pair(candidate_id, panel_id);
        if !active {
            info!(candidate_id, panel_id, "No active assignment to undo");
            return Ok(());
        }

        info!(candidate_id, panel_id, "Undoing assignment");
        let store = self.collections.store().clone();
        ConservativeMutation::new(&self.collections, "Undo assignment")
            .run(|| async move {
                match store.unassign(candidate_id, panel_id).await {
                    // The store no longer knows the pair, which is the state we wanted.
                    Err(e) if e.remote_status() == Some(404) => Ok(()),
                    other => other,
                }
            })
            .await?;

        self.collections.events().publish(PipelineEvent::AssignmentChanged {
            candidate_id: candidate_id.to_string(),
            panel_id: panel_id.to_string(),
            round: None,
        });
        Ok(())
    }

    /// Updates the check-in flag. Checking in moves the candidate to the
    /// front of the unassigned list; nothing else is reordered.
    pub async fn check_in(&self, candidate_id: &str, checked: bool) -> Result<()> {
        let result = self.try_check_in(candidate_id, checked).await;
        self.collections.events().report("Update check-in", result)
    }

    async fn try_check_in(&self, candidate_id: &str, checked: bool) -> Result<()> {
        self.candidate(candidate_id).await?;
        self.collections
            .store()
            .update_check_in(candidate_id, checked)
            .await?;

        let at = now();
        self.collections
            .update(|c| {
                c.patch_candidate(candidate_id, |candidate| {
                    // Re-checking in keeps the running wait timer.
                    if checked && candidate.checked_in && candidate.check_in_time.is_some() {
                        return;
                    }
                    candidate.checked_in = checked;
                    candidate.check_in_time = checked.then_some(at);
                    candidate.wait_duration_minutes = 0;
                });
                if checked {
                    c.move_to_front(candidate_id);
                }
            })
            .await;

        info!(candidate_id, checked, "Check-in updated");
        self.collections.events().publish(PipelineEvent::CheckInChanged {
            candidate_id: candidate_id.to_string(),
            checked_in: checked,
        });
        Ok(())
    }
}

/// Rules for sending a candidate to `round`.
///
/// A fresh candidate must be checked in and go to r1. A candidate that has
/// been through a round must hold an outcome that allows promotion and is
/// sent to the round that follows their last one.
pub fn check_assignable(candidate: &Candidate, round: Round) -> Result<()> {
    if !round.is_schedulable() {
        return Err(Error::Precondition(format!("round '{}' cannot be scheduled", round)));
    }
    if candidate.has_active_assignment() {
        return Err(Error::Precondition(format!(
            "candidate {} already has an active assignment",
            candidate.id
        )));
    }
    if candidate.is_completed() {
        return Err(Error::Precondition(format!(
            "candidate {} has finished the pipeline",
            candidate.id
        )));
    }

    let expected = successor(candidate.last_interview_round);
    if round != expected {
        return Err(Error::Precondition(format!(
            "candidate {} is due for round '{}', not '{}'",
            candidate.id, expected, round
        )));
    }

    if candidate.last_interview_round == Round::None {
        if !candidate.checked_in {
            return Err(Error::Precondition(format!(
                "candidate {} must be checked in before the first round",
                candidate.id
            )));
        }
    } else if !candidate.final_status.allows_promotion() {
        return Err(Error::Precondition(format!(
            "candidate {} with status '{}' cannot be promoted",
            candidate.id, candidate.final_status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::event_service::EventBus;
    use crate::services::store_service::MockCandidateStore;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(value: serde_json::Value) -> Candidate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn first_round_requires_check_in() {
        let mut c = candidate(json!({"id": "c1", "name": "A", "email": "a@x.io"}));
        assert!(matches!(check_assignable(&c, Round::R1), Err(Error::Precondition(_))));
        c.checked_in = true;
        assert!(check_assignable(&c, Round::R1).is_ok());
        assert!(check_assignable(&c, Round::R2).is_err());
    }

    #[test]
    fn promotion_follows_round_order_and_outcome() {
        let c = candidate(json!({
            "id": "c1", "name": "A", "email": "a@x.io",
            "final_status": "selected", "last_interview_round": "R1"
        }));
        assert!(check_assignable(&c, Round::R2).is_ok());
        assert!(check_assignable(&c, Round::R3).is_err());

        let busy = candidate(json!({
            "id": "c2", "name": "B", "email": "b@x.io",
            "final_status": "assigned", "last_interview_round": "r1"
        }));
        assert!(check_assignable(&busy, Round::R2).is_err());

        let finished = candidate(json!({
            "id": "c3", "name": "C", "email": "c@x.io",
            "final_status": "selected", "last_interview_round": "r3"
        }));
        assert!(check_assignable(&finished, Round::Final).is_err());
    }

    #[test]
    fn candidate_past_r3_cannot_restart_at_r1() {
        let c = candidate(json!({
            "id": "c1", "name": "A", "email": "a@x.io", "checked_in": true,
            "final_status": "selected", "last_interview_round": "final"
        }));
        assert!(matches!(check_assignable(&c, Round::R1), Err(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn failed_reload_after_assign_is_reported_and_blocks_a_repeat() {
        let mut store = MockCandidateStore::new();
        let fetches = Arc::new(AtomicUsize::new(0));
        store.expect_fetch_unassigned().returning(move || {
            if fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![candidate(json!({
                    "id": "c1", "name": "A", "email": "a@x.io", "checked_in": true
                }))])
            } else {
                Err(Error::Remote {
                    status: Some(503),
                    message: "Request failed with status 503".into(),
                })
            }
        });
        store.expect_fetch_assigned().returning(|| Ok(vec![]));
        store.expect_fetch_ongoing_interviews().returning(|| Ok(vec![]));
        store.expect_assign().times(1).returning(|_, _, _, _| Ok(()));

        let store = Arc::new(store);
        let collections = CollectionService::new(store.clone(), EventBus::default());
        collections.refresh().await.unwrap();
        let coordinator =
            AssignmentCoordinator::new(collections.clone(), EligibilityService::new(store));
        let mut rx = collections.events().subscribe();

        let err = coordinator.assign("c1", "p1", Round::R1, "u1").await.unwrap_err();
        assert!(matches!(err, Error::Stale(_)));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Toast { kind: ToastKind::Error, .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Toast { kind: ToastKind::Success, .. })));

        let again = coordinator.assign("c1", "p1", Round::R1, "u1").await.unwrap_err();
        assert!(matches!(again, Error::Stale(_)));
        assert!(!coordinator.is_assigning("c1"));
    }

    #[tokio::test]
    async fn checking_in_again_keeps_the_wait_timer() {
        let since = Utc::now() - Duration::minutes(12);
        let mut store = MockCandidateStore::new();
        store.expect_fetch_unassigned().returning(move || {
            Ok(vec![
                candidate(json!({"id": "c0", "name": "B", "email": "b@x.io"})),
                candidate(json!({
                    "id": "c1", "name": "A", "email": "a@x.io",
                    "checked_in": true, "check_in_time": since
                })),
            ])
        });
        store.expect_fetch_assigned().returning(|| Ok(vec![]));
        store.expect_fetch_ongoing_interviews().returning(|| Ok(vec![]));
        store.expect_update_check_in().times(1).returning(|_, _| Ok(()));

        let store = Arc::new(store);
        let collections = CollectionService::new(store.clone(), EventBus::default());
        collections.refresh().await.unwrap();
        let coordinator =
            AssignmentCoordinator::new(collections.clone(), EligibilityService::new(store));

        coordinator.check_in("c1", true).await.unwrap();

        let c = collections.find("c1").await.unwrap();
        assert!(c.checked_in);
        assert_eq!(c.check_in_time, Some(since));
        assert_eq!(collections.snapshot().await.unassigned[0].id, "c1");
    }

    #[tokio::test]
    async fn failed_assignment_clears_in_flight_marker_and_keeps_state() {
        let mut store = MockCandidateStore::new();
        store.expect_fetch_unassigned().returning(|| {
            Ok(vec![serde_json::from_value(json!({
                "id": "c1", "name": "A", "email": "a@x.io", "checked_in": true
            }))
            .unwrap()])
        });
        store.expect_fetch_assigned().returning(|| Ok(vec![]));
        store.expect_fetch_ongoing_interviews().returning(|| Ok(vec![]));
        store.expect_assign().times(1).returning(|_, _, _, _| {
            Err(Error::Remote {
                status: Some(500),
                message: "Request failed with status 500".into(),
            })
        });

        let store = Arc::new(store);
        let collections = CollectionService::new(store.clone(), EventBus::default());
        collections.refresh().await.unwrap();
        let coordinator =
            AssignmentCoordinator::new(collections.clone(), EligibilityService::new(store));
        let before = collections.snapshot().await;

        let err = coordinator.assign("c1", "p1", Round::R1, "u1").await.unwrap_err();
        assert!(matches!(err, Error::Remote { .. }));
        assert!(!coordinator.is_assigning("c1"));
        assert_eq!(collections.snapshot().await, before);
    }

    #[tokio::test]
    async fn second_call_for_same_candidate_is_rejected_while_first_runs() {
        let store = Arc::new(MockCandidateStore::new());
        let collections = CollectionService::new(store.clone(), EventBus::default());
        let coordinator = AssignmentCoordinator::new(collections, EligibilityService::new(store));

        let guard = coordinator.begin("c1").unwrap();
        assert!(matches!(coordinator.begin("c1"), Err(Error::InFlight(_))));
        assert!(coordinator.begin("c2").is_ok());
        assert_eq!(coordinator.assigning(), vec!["c1".to_string()]);
        drop(guard);
        assert!(coordinator.assigning().is_empty());
    }
}
