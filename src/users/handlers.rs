use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{Profile, UpdatePreferencesRequest, UpdateProfileRequest},
    repo,
};
use crate::{
    audit,
    auth::{
        extractors::AuthUser, repo as auth_repo, repo_types::User,
        services::clear_session_cookie,
    },
    calendar::is_valid_offset,
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_NAME_LEN: usize = 80;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/profile", get(get_profile).patch(update_profile))
        .route("/users/me/preferences", patch(update_preferences))
        .route("/users/me", axum::routing::delete(deactivate))
}

fn validate_profile(req: &UpdateProfileRequest) -> ApiResult<()> {
    for name in [&req.display_name, &req.onboarding_name].into_iter().flatten() {
        if name.trim().chars().count() > MAX_NAME_LEN {
            return Err(ApiError::bad_request(format!(
                "Names must be at most {MAX_NAME_LEN} characters"
            )));
        }
    }
    Ok(())
}

fn validate_preferences(req: &UpdatePreferencesRequest) -> ApiResult<()> {
    if let Some(offset) = req.utc_offset_minutes {
        if !is_valid_offset(offset) {
            return Err(ApiError::bad_request("utc_offset_minutes must be within ±14 hours"));
        }
    }
    if let Some(tz) = &req.timezone {
        if tz.trim().is_empty() || tz.len() > 64 {
            return Err(ApiError::bad_request("Invalid timezone"));
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Profile>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(Profile::from(user)))
}

#[instrument(skip(state, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    validate_profile(&body)?;
    let user = repo::update_profile(&state.db, user_id, &body)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(Profile::from(user)))
}

#[instrument(skip(state, body))]
pub async fn update_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdatePreferencesRequest>,
) -> ApiResult<Json<Profile>> {
    validate_preferences(&body)?;
    let user = repo::update_preferences(&state.db, user_id, &body)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(Profile::from(user)))
}

/// Soft delete: the row stays, every session is dropped.
#[instrument(skip(state))]
pub async fn deactivate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<impl IntoResponse> {
    repo::set_active(&state.db, user_id, false).await?;
    let dropped = auth_repo::delete_user_sessions(&state.db, user_id).await?;
    audit::record(&state.db, Some(user_id), "user.deactivated", json!({ "sessions": dropped })).await;
    info!(%user_id, "account deactivated");
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::sample_user;

    #[test]
    fn long_names_are_rejected() {
        let req = UpdateProfileRequest {
            display_name: Some("x".repeat(MAX_NAME_LEN + 1)),
            onboarding_name: None,
        };
        assert!(validate_profile(&req).is_err());
        let ok = UpdateProfileRequest {
            display_name: Some("Emma".into()),
            onboarding_name: Some("Em".into()),
        };
        assert!(validate_profile(&ok).is_ok());
    }

    #[test]
    fn preference_validation() {
        let bad_offset = UpdatePreferencesRequest {
            utc_offset_minutes: Some(15 * 60),
            ..Default::default()
        };
        assert!(validate_preferences(&bad_offset).is_err());
        let blank_tz = UpdatePreferencesRequest {
            timezone: Some("  ".into()),
            ..Default::default()
        };
        assert!(validate_preferences(&blank_tz).is_err());
        let ok = UpdatePreferencesRequest {
            timezone: Some("Europe/Berlin".into()),
            utc_offset_minutes: Some(120),
            notify_sms: Some(true),
            ..Default::default()
        };
        assert!(validate_preferences(&ok).is_ok());
    }

    #[test]
    fn profile_groups_preferences() {
        let mut user = sample_user();
        user.voice_id = Some("rachel".into());
        let json = serde_json::to_value(Profile::from(user)).unwrap();
        assert_eq!(json["preferences"]["voice_id"], "rachel");
        assert_eq!(json["preferences"]["notify_sms"], false);
        assert!(json.get("password_hash").is_none());
    }
}
