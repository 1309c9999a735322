use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::ongoing::OngoingInterview;
use crate::services::event_service::{EventBus, PipelineEvent};
use crate::services::store_service::CandidateStore;

/// Local copy of the store's candidate collections.
///
/// `combined` holds every candidate exactly once; when the store reports a
/// candidate as both unassigned and assigned, the assigned record wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub unassigned: Vec<Candidate>,
    pub assigned: Vec<Candidate>,
    pub combined: Vec<Candidate>,
    pub ongoing: Vec<OngoingInterview>,
}

impl Collections {
    pub fn from_fetch(
        unassigned: Vec<Candidate>,
        assigned: Vec<Candidate>,
        ongoing: Vec<OngoingInterview>,
    ) -> Self {
        let mut seen = HashSet::new();
        let assigned: Vec<Candidate> = assigned
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        let unassigned: Vec<Candidate> = unassigned
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        let combined = unassigned.iter().chain(assigned.iter()).cloned().collect();

        Self {
            unassigned,
            assigned,
            combined,
            ongoing,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Candidate> {
        self.combined.iter().find(|c| c.id == id)
    }

    /// Applies `f` to every copy of the candidate. Returns false if none matched.
    pub fn patch_candidate<F>(&mut self, id: &str, mut f: F) -> bool
    where
        F: FnMut(&mut Candidate),
    {
        let mut found = false;
        for list in [&mut self.unassigned, &mut self.assigned, &mut self.combined] {
            for candidate in list.iter_mut().filter(|c| c.id == id) {
                f(candidate);
                found = true;
            }
        }
        found
    }

    /// Moves the candidate to the head of the unassigned list, keeping the
    /// relative order of everyone else.
    pub fn move_to_front(&mut self, id: &str) {
        if let Some(index) = self.unassigned.iter().position(|c| c.id == id) {
            let candidate = self.unassigned.remove(index);
            self.unassigned.insert(0, candidate);
        }
    }

    pub fn remove(&mut self, ids: &HashSet<String>) {
        for list in [&mut self.unassigned, &mut self.assigned, &mut self.combined] {
            list.retain(|c| !ids.contains(&c.id));
        }
        self.ongoing.retain(|o| !ids.contains(&o.candidate_id));
    }

    /// Whether the engine believes `candidate_id` is currently bound to `panel_id`.
    pub fn has_active_pair(&self, candidate_id: &str, panel_id: &str) -> bool {
        let mut ongoing_for_candidate = self
            .ongoing
            .iter()
            .filter(|o| o.candidate_id == candidate_id)
            .peekable();
        if ongoing_for_candidate.peek().is_some() {
            return ongoing_for_candidate.any(|o| o.panel_id == panel_id);
        }
        self.find(candidate_id)
            .map(|c| c.has_active_assignment())
            .unwrap_or(false)
    }

    pub fn checked_in_count(&self) -> usize {
        self.combined.iter().filter(|c| c.checked_in).count()
    }
}

/// Sole owner of the candidate collections. Every mutation goes through
/// this type, either directly or via the mutation strategies.
#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn CandidateStore>,
    state: Arc<RwLock<Collections>>,
    events: EventBus,
    /// Set when the store accepted a change that local state has not seen yet.
    stale: Arc<AtomicBool>,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CandidateStore>, events: EventBus) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(Collections::default())),
            events,
            stale: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<dyn CandidateStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Collections {
        self.state.read().await.clone()
    }

    pub async fn find(&self, id: &str) -> Option<Candidate> {
        self.state.read().await.find(id).cloned()
    }

    pub async fn checked_in_count(&self) -> usize {
        self.state.read().await.checked_in_count()
    }

    async fn fetch(&self) -> Result<Collections> {
        let (unassigned, assigned, ongoing) = tokio::try_join!(
            self.store.fetch_unassigned(),
            self.store.fetch_assigned(),
            self.store.fetch_ongoing_interviews(),
        )?;
        Ok(Collections::from_fetch(unassigned, assigned, ongoing))
    }

    /// Reloads all collections; nothing changes locally unless every fetch succeeds.
    pub async fn refresh(&self) -> Result<()> {
        let fresh = self.fetch().await?;
        info!(
            unassigned = fresh.unassigned.len(),
            assigned = fresh.assigned.len(),
            ongoing = fresh.ongoing.len(),
            "Pipeline collections refreshed"
        );
        *self.state.write().await = fresh;
        self.stale.store(false, Ordering::SeqCst);
        self.events.publish(PipelineEvent::Refreshed { silent: false });
        Ok(())
    }

    /// Background resync after an optimistic mutation. Failures are only logged.
    pub async fn refresh_silently(&self) {
        match self.fetch().await {
            Ok(fresh) => {
                *self.state.write().await = fresh;
                self.stale.store(false, Ordering::SeqCst);
                self.events.publish(PipelineEvent::Refreshed { silent: true });
            }
            Err(e) => warn!(error = %e, "Silent refresh failed"),
        }
    }

    pub fn spawn_silent_refresh(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.refresh_silently().await })
    }

    /// Runs `f` under the write lock and returns the state as it was before.
    pub async fn apply<F>(&self, f: F) -> Collections
    where
        F: FnOnce(&mut Collections),
    {
        let mut guard = self.state.write().await;
        let before = guard.clone();
        f(&mut guard);
        before
    }

    pub async fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Collections) -> T,
    {
        let mut guard = self.state.write().await;
        f(&mut guard)
    }

    pub async fn restore(&self, snapshot: Collections) {
        *self.state.write().await = snapshot;
    }
}
