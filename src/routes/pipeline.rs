use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures_util::stream::{self, Stream};
use serde_json::{json, Value as JsonValue};
use tokio::sync::broadcast::error::RecvError;
use validator::Validate;

use crate::dto::pipeline_dto::{
    parse_round, AssignPayload, AssigningResponse, CheckInPayload, DeletePayload,
    EligiblePanelsQuery, MessageResponse, ProjectionQuery, StatusPayload, UndoPayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::candidate::{Candidate, RoundRecord};
use crate::models::ongoing::OngoingInterview;
use crate::models::panel::Panel;
use crate::models::status::FinalStatus;
use crate::services::candidate_service::DeleteReport;
use crate::services::projection_service::{project, Projections};
use crate::services::round_service::successor;
use crate::utils::time::now;
use crate::AppState;

#[axum::debug_handler]
pub async fn projections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProjectionQuery>,
) -> Result<Json<Projections>> {
    let view = state
        .projection_sessions
        .view(&claims.sub, query.filter()?, &query.pages());
    let collections = state.collections.snapshot().await;
    Ok(Json(project(&collections, &view, state.config.page_size, now())))
}

#[axum::debug_handler]
pub async fn ongoing(State(state): State<AppState>) -> Result<Json<Vec<OngoingInterview>>> {
    Ok(Json(state.collections.snapshot().await.ongoing))
}

#[axum::debug_handler]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    let result = state.collections.refresh().await;
    state.events.report("Refresh pipeline", result)?;
    Ok(Json(MessageResponse {
        message: "Pipeline refreshed".to_string(),
    }))
}

#[axum::debug_handler]
pub async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CheckInPayload>,
) -> Result<Json<MessageResponse>> {
    state
        .assignment_coordinator
        .check_in(&id, payload.checked_in)
        .await?;
    let message = if payload.checked_in {
        "Candidate checked in"
    } else {
        "Candidate check-in cleared"
    };
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

#[axum::debug_handler]
pub async fn eligible_panels(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EligiblePanelsQuery>,
) -> Result<Json<Vec<Panel>>> {
    let round = parse_round(query.round.as_deref())?;
    let panels = state.assignment_coordinator.eligible_panels(&id, round).await?;
    Ok(Json(panels))
}

#[axum::debug_handler]
pub async fn assign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<AssignPayload>,
) -> Result<Json<JsonValue>> {
    payload.validate()?;

    let round = match parse_round(payload.round.as_deref())? {
        Some(round) => round,
        None => {
            let candidate = state
                .collections
                .find(&id)
                .await
                .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
            successor(candidate.last_interview_round)
        }
    };

    state
        .assignment_coordinator
        .assign(&id, &payload.panel_id, round, &claims.sub)
        .await?;

    Ok(Json(json!({
        "message": "Candidate assigned",
        "round": round,
        "candidate": state.collections.find(&id).await,
    })))
}

#[axum::debug_handler]
pub async fn undo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UndoPayload>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;
    state
        .assignment_coordinator
        .undo(&id, &payload.panel_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Assignment released".to_string(),
    }))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Candidate>> {
    payload.validate()?;
    let status = FinalStatus::parse(&payload.status);
    let updated = state.candidate_service.change_status(&id, status).await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn record_round(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<RoundRecord>,
) -> Result<Json<Candidate>> {
    let updated = state.candidate_service.record_round(&id, record).await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn delete_candidates(
    State(state): State<AppState>,
    Json(payload): Json<DeletePayload>,
) -> Result<Json<DeleteReport>> {
    payload.validate()?;
    let report = state.candidate_service.delete_candidates(payload.ids).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn assigning(State(state): State<AppState>) -> Json<AssigningResponse> {
    Json(AssigningResponse {
        candidate_ids: state.assignment_coordinator.assigning(),
    })
}

/// Server-sent stream of pipeline events. Slow clients skip what they missed.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse) => return Some((Ok::<_, Infallible>(sse), rx)),
                    Err(e) => tracing::warn!(error = %e, "Could not encode pipeline event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
