pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::middleware::{auth::require_bearer_auth, rate_limit};
use crate::services::{
    assignment_service::AssignmentCoordinator, candidate_service::CandidateService,
    collection_service::CollectionService, eligibility_service::EligibilityService,
    event_service::EventBus, projection_service::ProjectionSessions, store_service::CandidateStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub events: EventBus,
    pub collections: CollectionService,
    pub projection_sessions: ProjectionSessions,
    pub assignment_coordinator: AssignmentCoordinator,
    pub candidate_service: CandidateService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CandidateStore>) -> Self {
        let events = EventBus::default();
        let collections = CollectionService::new(store.clone(), events.clone());
        let assignment_coordinator =
            AssignmentCoordinator::new(collections.clone(), EligibilityService::new(store));
        let candidate_service = CandidateService::new(collections.clone());

        Self {
            config: Arc::new(config),
            events,
            collections,
            projection_sessions: ProjectionSessions::new(),
            assignment_coordinator,
            candidate_service,
        }
    }
}

/// Health check plus the bearer-authenticated, rate-limited dashboard routes.
pub fn app(state: AppState) -> Router {
    use crate::routes::{health, pipeline};

    let pipeline_api = Router::new()
        .route("/api/pipeline/projections", get(pipeline::projections))
        .route("/api/pipeline/ongoing", get(pipeline::ongoing))
        .route("/api/pipeline/refresh", post(pipeline::refresh))
        .route("/api/pipeline/assigning", get(pipeline::assigning))
        .route("/api/pipeline/events", get(pipeline::events))
        .route(
            "/api/pipeline/candidates/delete",
            post(pipeline::delete_candidates),
        )
        .route(
            "/api/pipeline/candidates/:id/check-in",
            post(pipeline::check_in),
        )
        .route(
            "/api/pipeline/candidates/:id/eligible-panels",
            get(pipeline::eligible_panels),
        )
        .route("/api/pipeline/candidates/:id/assign", post(pipeline::assign))
        .route("/api/pipeline/candidates/:id/undo", post(pipeline::undo))
        .route(
            "/api/pipeline/candidates/:id/status",
            post(pipeline::update_status),
        )
        .route(
            "/api/pipeline/candidates/:id/rounds",
            post(pipeline::record_round),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::DashboardThrottle::new(state.config.dashboard_rps),
            rate_limit::throttle_dashboard,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(pipeline_api)
        .with_state(state)
}
