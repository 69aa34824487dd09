use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{PushSubscription, SubscribeRequest},
    repo,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_TOKEN_LEN: usize = 4096;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/subscriptions", get(list_subscriptions).post(subscribe))
        .route("/notifications/subscriptions/:id", delete(unsubscribe))
}

fn validate_token(token: &str) -> ApiResult<&str> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(ApiError::bad_request("token is too long"));
    }
    Ok(token)
}

/// 201 for a new device, 200 when the token was already registered.
#[instrument(skip(state, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<PushSubscription>)> {
    let token = validate_token(&body.token)?;
    let (sub, inserted) = repo::upsert(&state.db, user_id, body.platform, token).await?;
    info!(%user_id, platform = body.platform.as_str(), inserted, "push subscription stored");
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(sub)))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<PushSubscription>>> {
    Ok(Json(repo::list(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !repo::delete(&state.db, user_id, id).await? {
        return Err(ApiError::not_found("Subscription not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_validation() {
        assert_eq!(validate_token(" abc ").unwrap(), "abc");
        assert!(validate_token("   ").is_err());
        assert!(validate_token(&"t".repeat(MAX_TOKEN_LEN + 1)).is_err());
    }
}
