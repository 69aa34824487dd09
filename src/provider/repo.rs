use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{Appointment, LinkedPatient, ProviderMessage, ProviderNote};

/// False when the link already existed.
pub async fn link_patient(db: &PgPool, provider_id: Uuid, patient_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO provider_patients (provider_id, patient_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(provider_id)
    .bind(patient_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn is_linked(db: &PgPool, provider_id: Uuid, patient_id: Uuid) -> anyhow::Result<bool> {
    let linked = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM provider_patients WHERE provider_id = $1 AND patient_id = $2
        )
        "#,
    )
    .bind(provider_id)
    .bind(patient_id)
    .fetch_one(db)
    .await?;
    Ok(linked)
}

pub async fn list_patients(db: &PgPool, provider_id: Uuid) -> anyhow::Result<Vec<LinkedPatient>> {
    let rows = sqlx::query_as::<_, LinkedPatient>(
        r#"
        SELECT u.id, u.email, u.display_name, u.onboarding_name, u.is_active,
               pp.created_at AS linked_at
          FROM provider_patients pp
          JOIN users u ON u.id = pp.patient_id
         WHERE pp.provider_id = $1
         ORDER BY COALESCE(u.display_name, u.email) ASC
        "#,
    )
    .bind(provider_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_appointment(
    db: &PgPool,
    provider_id: Uuid,
    patient_id: Uuid,
    scheduled_for: OffsetDateTime,
    duration_minutes: i32,
    notes: Option<&str>,
) -> anyhow::Result<Appointment> {
    let row = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments (provider_id, patient_id, scheduled_for, duration_minutes, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, provider_id, patient_id, scheduled_for, duration_minutes, notes, created_at
        "#,
    )
    .bind(provider_id)
    .bind(patient_id)
    .bind(scheduled_for)
    .bind(duration_minutes)
    .bind(notes)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn list_appointments(db: &PgPool, provider_id: Uuid) -> anyhow::Result<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, provider_id, patient_id, scheduled_for, duration_minutes, notes, created_at
          FROM appointments
         WHERE provider_id = $1
         ORDER BY scheduled_for ASC
        "#,
    )
    .bind(provider_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_note(
    db: &PgPool,
    provider_id: Uuid,
    patient_id: Uuid,
    body: &str,
) -> anyhow::Result<ProviderNote> {
    let row = sqlx::query_as::<_, ProviderNote>(
        r#"
        INSERT INTO provider_notes (provider_id, patient_id, body)
        VALUES ($1, $2, $3)
        RETURNING id, provider_id, patient_id, body, created_at
        "#,
    )
    .bind(provider_id)
    .bind(patient_id)
    .bind(body)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Notes from every provider caring for the patient, newest first.
pub async fn list_notes(db: &PgPool, patient_id: Uuid) -> anyhow::Result<Vec<ProviderNote>> {
    let rows = sqlx::query_as::<_, ProviderNote>(
        r#"
        SELECT id, provider_id, patient_id, body, created_at
          FROM provider_notes
         WHERE patient_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.provider_id, \
         COALESCE(u.display_name, u.email) AS provider_name, \
         m.patient_id, m.body, m.created_at \
    FROM provider_messages m \
    JOIN users u ON u.id = m.provider_id";

pub async fn send_message(
    db: &PgPool,
    provider_id: Uuid,
    patient_id: Uuid,
    body: &str,
) -> anyhow::Result<ProviderMessage> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO provider_messages (provider_id, patient_id, body)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(provider_id)
    .bind(patient_id)
    .bind(body)
    .fetch_one(db)
    .await?;
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = $1");
    let row = sqlx::query_as::<_, ProviderMessage>(&sql)
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Messages to a patient; only one provider's when `provider_id` is set.
pub async fn list_messages(
    db: &PgPool,
    patient_id: Uuid,
    provider_id: Option<Uuid>,
) -> anyhow::Result<Vec<ProviderMessage>> {
    let sql = format!(
        "{MESSAGE_SELECT} WHERE m.patient_id = $1 AND ($2::uuid IS NULL OR m.provider_id = $2) \
         ORDER BY m.created_at DESC"
    );
    let rows = sqlx::query_as::<_, ProviderMessage>(&sql)
        .bind(patient_id)
        .bind(provider_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}
