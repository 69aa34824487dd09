use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        Appointment, BodyRequest, CreateAppointmentRequest, LinkedPatient, PatientSummary,
        ProviderMessage, ProviderNote,
    },
    repo,
};
use crate::{
    audit,
    auth::{
        extractors::{AuthUser, Principal, ProviderUser},
        repo_types::User,
    },
    calendar,
    care::{self, TaskProgress},
    error::{ApiError, ApiResult},
    mood,
    state::AppState,
};

const RECENT_MOODS: i64 = 7;
const MAX_BODY_LEN: usize = 5000;
const MAX_APPOINTMENT_MINUTES: i32 = 8 * 60;

pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/provider/patients", get(list_patients))
        .route("/provider/patients/:id", get(patient_summary))
        .route("/provider/patients/:id/appointments", post(create_appointment))
        .route("/provider/appointments", get(list_appointments))
        .route("/provider/patients/:id/notes", get(list_notes).post(create_note))
        .route("/provider/patients/:id/messages", get(list_messages).post(send_message))
}

pub fn inbox_routes() -> Router<AppState> {
    Router::new().route("/messages", get(inbox))
}

/// Providers may only act on linked patients; admins see everyone.
async fn ensure_access(state: &AppState, who: Principal, patient_id: Uuid) -> ApiResult<()> {
    if who.is_admin() || repo::is_linked(&state.db, who.user_id, patient_id).await? {
        return Ok(());
    }
    warn!(provider_id = %who.user_id, %patient_id, "unlinked patient access denied");
    Err(ApiError::forbidden("Patient is not assigned to you"))
}

fn required_body(body: &str) -> ApiResult<&str> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ApiError::bad_request("body is required"));
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(ApiError::bad_request(format!(
            "body must be at most {MAX_BODY_LEN} characters"
        )));
    }
    Ok(body)
}

fn validate_appointment(req: &CreateAppointmentRequest) -> ApiResult<()> {
    if !(1..=MAX_APPOINTMENT_MINUTES).contains(&req.duration_minutes) {
        return Err(ApiError::bad_request(format!(
            "duration_minutes must be between 1 and {MAX_APPOINTMENT_MINUTES}"
        )));
    }
    if req.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_BODY_LEN) {
        return Err(ApiError::bad_request("notes are too long"));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_patients(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
) -> ApiResult<Json<Vec<LinkedPatient>>> {
    Ok(Json(repo::list_patients(&state.db, who.user_id).await?))
}

#[instrument(skip(state))]
pub async fn patient_summary(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<PatientSummary>> {
    ensure_access(&state, who, patient_id).await?;
    let patient = User::find_by_id(&state.db, patient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient not found"))?;

    let recent_moods = mood::repo::latest(&state.db, patient_id, RECENT_MOODS).await?;
    let day = calendar::local_today(patient.utc_offset_minutes);
    let tasks = care::repo::tasks_for_day(&state.db, patient_id, day).await?;
    audit::record_access(&state.db, who.user_id, patient_id, "patient_summary").await;

    Ok(Json(PatientSummary {
        profile: patient.into(),
        recent_moods,
        today_tasks: TaskProgress::of(&tasks),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_appointment(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
    Json(body): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    ensure_access(&state, who, patient_id).await?;
    validate_appointment(&body)?;
    let notes = body.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let appt = repo::create_appointment(
        &state.db,
        who.user_id,
        patient_id,
        body.scheduled_for,
        body.duration_minutes,
        notes,
    )
    .await?;
    info!(provider_id = %who.user_id, %patient_id, appointment_id = %appt.id, "appointment scheduled");
    Ok((StatusCode::CREATED, Json(appt)))
}

#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(repo::list_appointments(&state.db, who.user_id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_note(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
    Json(body): Json<BodyRequest>,
) -> ApiResult<(StatusCode, Json<ProviderNote>)> {
    ensure_access(&state, who, patient_id).await?;
    let text = required_body(&body.body)?;
    let note = repo::create_note(&state.db, who.user_id, patient_id, text).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[instrument(skip(state))]
pub async fn list_notes(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProviderNote>>> {
    ensure_access(&state, who, patient_id).await?;
    let notes = repo::list_notes(&state.db, patient_id).await?;
    audit::record_access(&state.db, who.user_id, patient_id, "provider_notes").await;
    Ok(Json(notes))
}

#[instrument(skip(state, body))]
pub async fn send_message(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
    Json(body): Json<BodyRequest>,
) -> ApiResult<(StatusCode, Json<ProviderMessage>)> {
    ensure_access(&state, who, patient_id).await?;
    let text = required_body(&body.body)?;
    let msg = repo::send_message(&state.db, who.user_id, patient_id, text).await?;
    info!(provider_id = %who.user_id, %patient_id, "message sent to patient");
    Ok((StatusCode::CREATED, Json(msg)))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    ProviderUser(who): ProviderUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProviderMessage>>> {
    ensure_access(&state, who, patient_id).await?;
    let provider = (!who.is_admin()).then_some(who.user_id);
    Ok(Json(repo::list_messages(&state.db, patient_id, provider).await?))
}

/// Messages addressed to the caller from any of their providers.
#[instrument(skip(state))]
pub async fn inbox(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<ProviderMessage>>> {
    Ok(Json(repo::list_messages(&state.db, user_id, None).await?))
}
