use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::repo_types::{MessageRow, SessionKind, SessionRow, SessionSummaryRow};

pub async fn find_session_for_day(
    db: &PgPool,
    user_id: Uuid,
    kind: SessionKind,
    day: Date,
) -> anyhow::Result<Option<SessionRow>> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, kind, session_date, completed
          FROM conversation_sessions
         WHERE user_id = $1 AND kind = $2 AND session_date = $3
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(day)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn find_session(
    db: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
) -> anyhow::Result<Option<SessionRow>> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT id, kind, session_date, completed
          FROM conversation_sessions
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn list_messages(db: &PgPool, session_id: Uuid) -> anyhow::Result<Vec<MessageRow>> {
    let rows = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT role, text, created_at
          FROM conversation_messages
         WHERE session_id = $1
         ORDER BY seq ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_sessions(
    db: &PgPool,
    user_id: Uuid,
    kind: Option<SessionKind>,
    limit: i64,
) -> anyhow::Result<Vec<SessionSummaryRow>> {
    let rows = sqlx::query_as::<_, SessionSummaryRow>(
        r#"
        SELECT s.id, s.kind, s.session_date, s.completed, s.created_at,
               (SELECT COUNT(*) FROM conversation_messages m WHERE m.session_id = s.id) AS message_count
          FROM conversation_sessions s
         WHERE s.user_id = $1 AND ($2::text IS NULL OR s.kind = $2)
         ORDER BY s.session_date DESC, s.created_at DESC
         LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(kind.map(SessionKind::as_str))
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Returns the session id for (user, kind, day) and whether this call created it.
pub async fn upsert_session_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    kind: SessionKind,
    day: Date,
) -> anyhow::Result<(Uuid, bool)> {
    let row = sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        INSERT INTO conversation_sessions (user_id, kind, session_date)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, kind, session_date)
        DO UPDATE SET updated_at = now()
        RETURNING id, (xmax = 0) AS inserted
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(day)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn insert_message_tx(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    role: &str,
    text: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages (session_id, role, text)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(session_id)
    .bind(role)
    .bind(text)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Sets the completed flag when `completed_now`; returns the stored flag.
pub async fn touch_completed_tx(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    completed_now: bool,
) -> anyhow::Result<bool> {
    let completed = sqlx::query_scalar::<_, bool>(
        r#"
        UPDATE conversation_sessions
           SET completed = completed OR $2, updated_at = now()
         WHERE id = $1
        RETURNING completed
        "#,
    )
    .bind(session_id)
    .bind(completed_now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(completed)
}
