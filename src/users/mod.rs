use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod memory_repo;
pub mod pg_repo;
pub mod repo;
pub mod service;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
