use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CareTeamMember, CreateMemberRequest, UpdateMemberRequest},
    repo,
};
use crate::{
    auth::{extractors::AuthUser, services::is_valid_email},
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_FIELD_LEN: usize = 200;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/care-team", get(list_members).post(add_member))
        .route("/care-team/:id", patch(update_member).delete(remove_member))
}

fn check_field(name: &str, value: Option<&str>, required: bool) -> ApiResult<()> {
    match value.map(str::trim) {
        Some("") | None if required => Err(ApiError::bad_request(format!("{name} is required"))),
        Some(v) if v.chars().count() > MAX_FIELD_LEN => {
            Err(ApiError::bad_request(format!("{name} is too long")))
        }
        _ => Ok(()),
    }
}

fn check_email(email: Option<&str>) -> ApiResult<()> {
    match email {
        Some(e) if !is_valid_email(e.trim()) => Err(ApiError::bad_request("Invalid email")),
        _ => Ok(()),
    }
}

fn validate_create(req: &CreateMemberRequest) -> ApiResult<()> {
    check_field("name", Some(req.name.as_str()), true)?;
    check_field("role", Some(req.role.as_str()), true)?;
    check_field("phone", req.phone.as_deref(), false)?;
    check_email(req.email.as_deref())
}

fn validate_update(req: &UpdateMemberRequest) -> ApiResult<()> {
    if let Some(name) = &req.name {
        check_field("name", Some(name.as_str()), true)?;
    }
    if let Some(role) = &req.role {
        check_field("role", Some(role.as_str()), true)?;
    }
    check_field("phone", req.phone.as_deref(), false)?;
    check_email(req.email.as_deref())
}

#[instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<CareTeamMember>>> {
    Ok(Json(repo::list(&state.db, user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMemberRequest>,
) -> ApiResult<(StatusCode, Json<CareTeamMember>)> {
    validate_create(&body)?;
    let member = repo::create(&state.db, user_id, &body).await?;
    info!(%user_id, member_id = %member.id, primary = member.is_primary, "care team member added");
    Ok((StatusCode::CREATED, Json(member)))
}

#[instrument(skip(state, body))]
pub async fn update_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(member_id): Path<Uuid>,
    Json(body): Json<UpdateMemberRequest>,
) -> ApiResult<Json<CareTeamMember>> {
    validate_update(&body)?;
    repo::update(&state.db, user_id, member_id, &body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Care team member not found"))
}

#[instrument(skip(state))]
pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(member_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !repo::delete(&state.db, user_id, member_id).await? {
        return Err(ApiError::not_found("Care team member not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req() -> CreateMemberRequest {
        CreateMemberRequest {
            name: "Dr. Adams".into(),
            role: "Cardiologist".into(),
            email: Some("adams@clinic.example.com".into()),
            phone: None,
            is_primary: false,
        }
    }

    #[test]
    fn create_requires_name_and_role() {
        assert!(validate_create(&create_req()).is_ok());
        let mut r = create_req();
        r.name = "  ".into();
        assert_eq!(validate_create(&r).unwrap_err().to_string(), "name is required");
    }

    #[test]
    fn bad_email_rejected() {
        let mut r = create_req();
        r.email = Some("not-an-email".into());
        assert!(validate_create(&r).is_err());
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        assert!(validate_update(&UpdateMemberRequest::default()).is_ok());
        let blank_name = UpdateMemberRequest {
            name: Some("".into()),
            ..Default::default()
        };
        assert!(validate_update(&blank_name).is_err());
    }
}
