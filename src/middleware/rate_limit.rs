use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket shared by every dashboard request. Holds up to `burst`
/// tokens and refills `burst` of them per second, so short bursts pass
/// while a sustained flood is cut to the configured rate.
#[derive(Clone, Debug)]
pub struct DashboardThrottle {
    burst: f64,
    bucket: Arc<Mutex<Bucket>>,
}

impl DashboardThrottle {
    pub fn new(requests_per_second: u32) -> Self {
        let burst = f64::from(requests_per_second.max(1));
        Self {
            burst,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: burst,
                refilled_at: Instant::now(),
            })),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(|p| p.into_inner());
        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.burst).min(self.burst);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn throttle_dashboard(
    State(throttle): State<DashboardThrottle>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !throttle.try_acquire() {
        tracing::warn!(path = %req.uri().path(), "Dashboard request throttled");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "too_many_requests" })),
        )
            .into_response();
    }
    next.run(req).await
}
