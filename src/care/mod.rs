mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use dto::TaskProgress;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
