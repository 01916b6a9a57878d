use crate::state::AppState;
use axum::Router;

pub mod catalog;
pub(crate) mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::booking_routes()
}
