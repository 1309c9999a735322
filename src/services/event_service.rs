use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::models::round::Round;
use crate::models::status::FinalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

/// Notifications views subscribe to instead of polling the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Candidate collections were replaced with a fresh fetch from the store.
    Refreshed { silent: bool },
    AssignmentChanged {
        candidate_id: String,
        panel_id: String,
        round: Option<Round>,
    },
    CheckInChanged { candidate_id: String, checked_in: bool },
    StatusChanged { candidate_id: String, status: FinalStatus },
    RoundRecorded { candidate_id: String, round: Round },
    CandidatesDeleted { ids: Vec<String> },
    RolledBack { operation: String },
    WaitTick { at: DateTime<Utc>, checked_in: usize },
    Toast { kind: ToastKind, message: String },
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Refreshed { .. } => "refreshed",
            PipelineEvent::AssignmentChanged { .. } => "assignment_changed",
            PipelineEvent::CheckInChanged { .. } => "check_in_changed",
            PipelineEvent::StatusChanged { .. } => "status_changed",
            PipelineEvent::RoundRecorded { .. } => "round_recorded",
            PipelineEvent::CandidatesDeleted { .. } => "candidates_deleted",
            PipelineEvent::RolledBack { .. } => "rolled_back",
            PipelineEvent::WaitTick { .. } => "wait_tick",
            PipelineEvent::Toast { .. } => "toast",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: PipelineEvent) {
        // No subscribers is not an error; views come and go.
        let _ = self.sender.send(event);
    }

    pub fn toast(&self, kind: ToastKind, message: impl Into<String>) {
        self.publish(PipelineEvent::Toast {
            kind,
            message: message.into(),
        });
    }

    /// Surfaces a failed operation to subscribed views and passes the result through.
    pub fn report<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(operation, error = %err, "Pipeline operation failed");
            self.toast(ToastKind::Error, format!("{}: {}", operation, err));
        }
        result
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn report_publishes_an_error_toast() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let result: Result<()> = bus.report("Assign candidate", Err(Error::NotFound("c-1".into())));
        assert!(result.is_err());

        match rx.recv().await.unwrap() {
            PipelineEvent::Toast { kind, message } => {
                assert_eq!(kind, ToastKind::Error);
                assert!(message.starts_with("Assign candidate:"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(PipelineEvent::Refreshed { silent: true });
    }
}
