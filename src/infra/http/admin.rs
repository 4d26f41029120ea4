//! Operator listener: database health and index cache control.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{application::repos::HealthRepo, cache::CacheState};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub db: Arc<dyn HealthRepo>,
    pub cache: Option<CacheState>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache/index/flush", post(flush_index_cache))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.db.ping().await)
}

/// Evict every cached index page. A disabled cache has nothing to evict.
async fn flush_index_cache(State(state): State<AdminState>) -> Response {
    if let Some(cache) = &state.cache {
        cache.flush();
    }
    StatusCode::NO_CONTENT.into_response()
}
