//! The two ways the engine mutates candidate state.
//!
//! `ConservativeMutation` waits for the store and then reloads everything;
//! it is used where the mutation moves candidates between projections.
//! A failed reload leaves the collections flagged stale.
//! `OptimisticMutation` changes local state first and restores the exact
//! prior snapshot if the store rejects the change.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::services::collection_service::{CollectionService, Collections};
use crate::services::event_service::PipelineEvent;

pub struct ConservativeMutation<'a> {
    collections: &'a CollectionService,
    operation: &'a str,
}

impl<'a> ConservativeMutation<'a> {
    pub fn new(collections: &'a CollectionService, operation: &'a str) -> Self {
        Self {
            collections,
            operation,
        }
    }

    /// Local state is untouched when `remote` fails. When the store accepts
    /// the change but the reload fails, the collections are marked stale and
    /// `Error::Stale` is returned.
    pub async fn run<T, R, Fut>(&self, remote: R) -> Result<T>
    where
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = remote().await?;
        debug!(operation = self.operation, "Store confirmed mutation, refreshing");
        if let Err(e) = self.collections.refresh().await {
            warn!(operation = self.operation, error = %e, "Refresh after mutation failed");
            self.collections.mark_stale();
            return Err(Error::Stale(e.to_string()));
        }
        Ok(value)
    }
}

pub struct OptimisticMutation<'a> {
    collections: &'a CollectionService,
    operation: &'a str,
}

impl<'a> OptimisticMutation<'a> {
    pub fn new(collections: &'a CollectionService, operation: &'a str) -> Self {
        Self {
            collections,
            operation,
        }
    }

    /// Applies `local` immediately, then awaits `remote`. On success a silent
    /// background refresh resyncs with the store; on failure the snapshot
    /// taken just before `local` is restored.
    pub async fn run<T, L, R, Fut>(&self, local: L, remote: R) -> Result<T>
    where
        L: FnOnce(&mut Collections),
        R: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let snapshot = self.collections.apply(local).await;

        match remote().await {
            Ok(value) => {
                self.collections.spawn_silent_refresh();
                Ok(value)
            }
            Err(e) => {
                self.collections.restore(snapshot).await;
                warn!(operation = self.operation, error = %e, "Store rejected mutation, rolled back");
                self.collections.events().publish(PipelineEvent::RolledBack {
                    operation: self.operation.to_string(),
                });
                Err(Error::RolledBack(e.to_string()))
            }
        }
    }
}
