mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use dto::MoodEntry;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
