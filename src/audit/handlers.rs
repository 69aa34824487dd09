use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{instrument, warn};

use super::{dto::ClientErrorReport, repo};
use crate::{auth::extractors::AuthUser, state::AppState};

pub fn client_error_routes() -> Router<AppState> {
    Router::new().route("/client-errors", post(report_client_error))
}

/// Always answers 204: reporting a client error must never fail the client.
#[instrument(skip(state, auth, body))]
pub async fn report_client_error(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    body: Option<Json<ClientErrorReport>>,
) -> StatusCode {
    let Some(Json(report)) = body else {
        warn!("unparseable client error report");
        return StatusCode::NO_CONTENT;
    };
    let user_id = auth.map(|AuthUser(id)| id);
    if let Err(e) = repo::insert_client_error(&state.db, user_id, &report).await {
        warn!(error = %e, "client error not stored");
    }
    StatusCode::NO_CONTENT
}
