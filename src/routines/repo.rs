use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::dto::{RoutineKind, RoutineSession};

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    kind: RoutineKind,
    duration_seconds: i32,
    notes: Option<&str>,
    completed_on: Date,
) -> anyhow::Result<RoutineSession> {
    let row = sqlx::query_as::<_, RoutineSession>(
        r#"
        INSERT INTO routine_sessions (user_id, kind, duration_seconds, notes, completed_on)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, kind, duration_seconds, notes, completed_on, created_at
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(duration_seconds)
    .bind(notes)
    .bind(completed_on)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn list_recent(db: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<RoutineSession>> {
    let rows = sqlx::query_as::<_, RoutineSession>(
        r#"
        SELECT id, kind, duration_seconds, notes, completed_on, created_at
          FROM routine_sessions
         WHERE user_id = $1
         ORDER BY completed_on DESC, created_at DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Distinct completion dates, newest first; all kinds when `kind` is `None`.
pub async fn completion_dates(
    db: &PgPool,
    user_id: Uuid,
    kind: Option<RoutineKind>,
) -> anyhow::Result<Vec<Date>> {
    let dates = sqlx::query_scalar::<_, Date>(
        r#"
        SELECT DISTINCT completed_on
          FROM routine_sessions
         WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)
         ORDER BY completed_on DESC
        "#,
    )
    .bind(user_id)
    .bind(kind.map(RoutineKind::as_str))
    .fetch_all(db)
    .await?;
    Ok(dates)
}
