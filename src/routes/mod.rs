pub mod auth;
pub mod boards;
pub mod health;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/auth", get(auth::install))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/boards/{channel_id}", get(boards::get_board))
        .route("/boards/{channel_id}/cells", post(boards::add_cell))
        .route(
            "/boards/{channel_id}/cells/{position}",
            delete(boards::remove_cell),
        )
        .route(
            "/boards/{channel_id}/cells/{position}/mark",
            post(boards::mark_cell),
        )
        .route("/boards/{channel_id}/switch", post(boards::switch_cells))
        .route("/boards/{channel_id}/reset", post(boards::reset_board))
        .route("/boards/{channel_id}/session", delete(boards::close_session))
}
