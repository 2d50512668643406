pub mod api;
mod middleware;
mod public;

pub use api::{ApiState, build_api_router};
pub use middleware::REQUEST_ID_HEADER;
pub use public::{CACHE_STATUS_HEADER, HttpState, build_router as build_public_router};

use axum::{Router, extract::FromRef, middleware as axum_middleware};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub api: ApiState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Page routes, the ingest endpoint and the health check, wrapped in the
/// request-id and response-logging layers.
pub fn build_router(state: RouterState) -> Router {
    build_public_router()
        .merge(build_api_router())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
