#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use interview_pipeline::config::Config;
use interview_pipeline::error::{Error, Result};
use interview_pipeline::middleware::auth::Claims;
use interview_pipeline::models::candidate::{Candidate, CandidatePatch, DeleteCandidatesResponse};
use interview_pipeline::models::ongoing::OngoingInterview;
use interview_pipeline::models::panel::{Panel, PanelStatus, PanelistType};
use interview_pipeline::models::round::Round;
use interview_pipeline::models::status::FinalStatus;
use interview_pipeline::services::store_service::CandidateStore;
use interview_pipeline::AppState;

pub const JWT_SECRET: &str = "test_secret_key";

#[derive(Default)]
pub struct FakeState {
    pub unassigned: Vec<Candidate>,
    pub assigned: Vec<Candidate>,
    pub ongoing: Vec<OngoingInterview>,
    pub panels: Vec<Panel>,
    /// Records as they were before assignment, restored on unassign.
    pub before_assign: HashMap<String, Candidate>,
    pub assign_calls: Vec<(String, String, Round, String)>,
    pub unassign_calls: usize,
    pub fail_updates: bool,
}

/// In-memory stand-in for the candidate record store.
#[derive(Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new(unassigned: Vec<Candidate>, assigned: Vec<Candidate>, panels: Vec<Panel>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                unassigned,
                assigned,
                panels,
                ..Default::default()
            })),
        }
    }

    pub fn fail_updates(&self) {
        self.state.lock().unwrap().fail_updates = true;
    }

    fn remote(status: u16) -> Error {
        Error::Remote {
            status: Some(status),
            message: format!("Request failed with status {}", status),
        }
    }
}

fn find_mut<'a>(state: &'a mut FakeState, id: &str) -> Option<&'a mut Candidate> {
    state
        .unassigned
        .iter_mut()
        .chain(state.assigned.iter_mut())
        .find(|c| c.id == id)
}

#[async_trait]
impl CandidateStore for FakeStore {
    async fn fetch_unassigned(&self) -> Result<Vec<Candidate>> {
        Ok(self.state.lock().unwrap().unassigned.clone())
    }

    async fn fetch_assigned(&self) -> Result<Vec<Candidate>> {
        Ok(self.state.lock().unwrap().assigned.clone())
    }

    async fn fetch_ongoing_interviews(&self) -> Result<Vec<OngoingInterview>> {
        Ok(self.state.lock().unwrap().ongoing.clone())
    }

    async fn fetch_panels(&self) -> Result<Vec<Panel>> {
        Ok(self.state.lock().unwrap().panels.clone())
    }

    async fn update_candidate(&self, id: &str, patch: &CandidatePatch) -> Result<Candidate> {
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(Self::remote(500));
        }
        let candidate = find_mut(&mut state, id).ok_or_else(|| Self::remote(404))?;
        patch.apply_to(candidate);
        Ok(candidate.clone())
    }

    async fn update_check_in(&self, id: &str, checked: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let candidate = find_mut(&mut state, id).ok_or_else(|| Self::remote(404))?;
        candidate.checked_in = checked;
        candidate.check_in_time = checked.then(Utc::now);
        Ok(())
    }

    async fn eligible_panels(&self, _candidate_id: &str, _vacancy_id: &str) -> Result<Vec<Panel>> {
        Ok(self.state.lock().unwrap().panels.clone())
    }

    async fn assign(
        &self,
        candidate_id: &str,
        panel_id: &str,
        round: Round,
        assigned_by: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let panel = state
            .panels
            .iter()
            .find(|p| p.id == panel_id)
            .cloned()
            .ok_or_else(|| Self::remote(404))?;

        let mut candidate = match state.unassigned.iter().position(|c| c.id == candidate_id) {
            Some(index) => state.unassigned.remove(index),
            None => {
                let index = state
                    .assigned
                    .iter()
                    .position(|c| c.id == candidate_id)
                    .ok_or_else(|| Self::remote(404))?;
                state.assigned.remove(index)
            }
        };
        state
            .before_assign
            .insert(candidate_id.to_string(), candidate.clone());

        candidate.final_status = FinalStatus::Assigned;
        candidate.last_interview_round = round;
        candidate.panel_name = Some(panel.name.clone());
        state.ongoing.push(OngoingInterview {
            candidate_id: candidate.id.clone(),
            candidate_name: candidate.name.clone(),
            panel_id: panel.id.clone(),
            panel_name: panel.name.clone(),
            round,
        });
        state.assigned.push(candidate);
        state.assign_calls.push((
            candidate_id.to_string(),
            panel_id.to_string(),
            round,
            assigned_by.to_string(),
        ));
        Ok(())
    }

    async fn unassign(&self, candidate_id: &str, panel_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.unassign_calls += 1;
        let Some(index) = state
            .ongoing
            .iter()
            .position(|o| o.candidate_id == candidate_id && o.panel_id == panel_id)
        else {
            return Err(Self::remote(404));
        };
        state.ongoing.remove(index);
        state.assigned.retain(|c| c.id != candidate_id);
        if let Some(previous) = state.before_assign.remove(candidate_id) {
            if previous.last_interview_round == Round::None {
                state.unassigned.insert(0, previous);
            } else {
                state.assigned.push(previous);
            }
        }
        Ok(())
    }

    async fn delete_candidates(&self, ids: &[String]) -> Result<DeleteCandidatesResponse> {
        let mut state = self.state.lock().unwrap();
        let before = state.unassigned.len() + state.assigned.len();
        state.unassigned.retain(|c| !ids.contains(&c.id));
        state.assigned.retain(|c| !ids.contains(&c.id));
        let deleted = before - state.unassigned.len() - state.assigned.len();
        Ok(DeleteCandidatesResponse {
            deleted_count: deleted as u64,
            message: format!("{} candidate(s) deleted", deleted),
        })
    }
}

pub fn candidate(value: JsonValue) -> Candidate {
    let mut base = json!({
        "name": "Candidate",
        "email": "candidate@example.com",
        "applied_position": "Backend Engineer",
        "vacancyId": "v1",
    });
    base.as_object_mut()
        .unwrap()
        .extend(value.as_object().unwrap().clone());
    serde_json::from_value(base).unwrap()
}

pub fn panel(id: &str, kind: PanelistType, status: PanelStatus) -> Panel {
    Panel {
        id: id.to_string(),
        name: format!("Panel {}", id),
        email: format!("{}@example.com", id),
        skill_set: vec!["rust".to_string()],
        current_status: status,
        panelist_type: kind,
    }
}

pub fn config() -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        store_base_url: "http://store.invalid/".to_string(),
        store_api_token: "store-token".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        dashboard_rps: 1000,
        page_size: 10,
        store_timeout_secs: 5,
    }
}

pub fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: Some("hr".to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// App over `store`, with collections already loaded.
pub async fn app_with(store: FakeStore) -> (Router, AppState) {
    let state = AppState::new(config(), Arc::new(store));
    state.collections.refresh().await.expect("initial refresh");
    (interview_pipeline::app(state.clone()), state)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, json)
}

pub fn ids(page: &JsonValue) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect()
}
