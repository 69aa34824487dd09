pub mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use repo::{record, record_access};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::client_error_routes())
}
