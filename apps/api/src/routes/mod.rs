pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/users/:user_id", get(handlers::handle_get_user))
        .route(
            "/api/v1/users/:user_id/history",
            post(handlers::handle_capture_history),
        )
        .route(
            "/api/v1/users/:user_id/history/:role_id/inputs",
            post(handlers::handle_add_input),
        )
        .route(
            "/api/v1/users/:user_id/normalize",
            post(handlers::handle_normalize),
        )
        .route(
            "/api/v1/users/:user_id/resumes",
            post(handlers::handle_tailor),
        )
        .route(
            "/api/v1/users/:user_id/resumes/:key",
            get(handlers::handle_get_resume),
        )
        .with_state(state)
}
