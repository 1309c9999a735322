pub mod assignment_service;
pub mod candidate_service;
pub mod collection_service;
pub mod eligibility_service;
pub mod event_service;
pub mod projection_service;
pub mod reconcile_service;
pub mod round_service;
pub mod store_service;
pub mod wait_service;
