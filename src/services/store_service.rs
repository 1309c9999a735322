use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidatePatch, DeleteCandidatesResponse};
use crate::models::ongoing::OngoingInterview;
use crate::models::panel::Panel;
use crate::models::round::Round;

/// The remote Candidate Record Store. It owns persistence and the
/// candidate/panel assignment table; the pipeline engine only calls it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn fetch_unassigned(&self) -> Result<Vec<Candidate>>;

    async fn fetch_assigned(&self) -> Result<Vec<Candidate>>;

    async fn fetch_ongoing_interviews(&self) -> Result<Vec<OngoingInterview>>;

    /// Full panel directory, used when eligibility bypasses vacancy scope.
    async fn fetch_panels(&self) -> Result<Vec<Panel>>;

    /// Partial update; returns the full updated record.
    async fn update_candidate(&self, id: &str, patch: &CandidatePatch) -> Result<Candidate>;

    async fn update_check_in(&self, id: &str, checked: bool) -> Result<()>;

    async fn eligible_panels(&self, candidate_id: &str, vacancy_id: &str) -> Result<Vec<Panel>>;

    async fn assign(
        &self,
        candidate_id: &str,
        panel_id: &str,
        round: Round,
        assigned_by: &str,
    ) -> Result<()>;

    async fn unassign(&self, candidate_id: &str, panel_id: &str) -> Result<()>;

    async fn delete_candidates(&self, ids: &[String]) -> Result<DeleteCandidatesResponse>;
}

/// `CandidateStore` over the store's REST API.
#[derive(Clone)]
pub struct HttpCandidateStore {
    client: Client,
    base_url: Url,
    api_token: String,
}

impl HttpCandidateStore {
    pub fn new(base_url: &str, api_token: String, timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_token: api_token.trim().to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.api_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            });
        let message = match detail {
            Some(detail) => format!("{} ({})", detail, status),
            None => format!("Request failed with status {}", status),
        };
        Err(Error::Remote {
            status: Some(status.as_u16()),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CandidateStore for HttpCandidateStore {
    async fn fetch_unassigned(&self) -> Result<Vec<Candidate>> {
        let url = self.endpoint("candidates/unassigned")?;
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_assigned(&self) -> Result<Vec<Candidate>> {
        let url = self.endpoint("candidates/assigned")?;
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_ongoing_interviews(&self) -> Result<Vec<OngoingInterview>> {
        let url = self.endpoint("interviews/ongoing")?;
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_panels(&self) -> Result<Vec<Panel>> {
        let url = self.endpoint("panels")?;
        self.send_json(self.client.get(url)).await
    }

    async fn update_candidate(&self, id: &str, patch: &CandidatePatch) -> Result<Candidate> {
        let url = self.endpoint(&format!("candidates/{}", id))?;
        debug!(candidate_id = id, "Updating candidate");
        self.send_json(self.client.patch(url).json(patch)).await
    }

    async fn update_check_in(&self, id: &str, checked: bool) -> Result<()> {
        let url = self.endpoint(&format!("candidates/{}/check-in", id))?;
        self.send(self.client.patch(url).json(&json!({ "checked_in": checked })))
            .await?;
        Ok(())
    }

    async fn eligible_panels(&self, candidate_id: &str, vacancy_id: &str) -> Result<Vec<Panel>> {
        let mut url = self.endpoint(&format!("candidates/{}/eligible-panels", candidate_id))?;
        url.query_pairs_mut().append_pair("vacancyId", vacancy_id);
        self.send_json(self.client.get(url)).await
    }

    async fn assign(
        &self,
        candidate_id: &str,
        panel_id: &str,
        round: Round,
        assigned_by: &str,
    ) -> Result<()> {
        let url = self.endpoint("assignments")?;
        let body = json!({
            "candidateId": candidate_id,
            "panelId": panel_id,
            "round": round,
            "assignedBy": assigned_by,
        });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn unassign(&self, candidate_id: &str, panel_id: &str) -> Result<()> {
        let url = self.endpoint("assignments/undo")?;
        let body = json!({ "candidateId": candidate_id, "panelId": panel_id });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn delete_candidates(&self, ids: &[String]) -> Result<DeleteCandidatesResponse> {
        let url = self.endpoint("candidates/delete")?;
        self.send_json(self.client.post(url).json(&json!({ "ids": ids })))
            .await
    }
}
