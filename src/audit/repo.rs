use serde_json::Value;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::dto::{AccessLogEntry, AuditLogEntry, ClientErrorEntry, ClientErrorReport};

const MAX_FIELD_LEN: usize = 8 * 1024;

/// Append an audit event. Failures are logged and never reach the caller.
pub async fn record(db: &PgPool, user_id: Option<Uuid>, action: &str, metadata: Value) {
    let res = sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, metadata)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(metadata)
    .execute(db)
    .await;
    if let Err(e) = res {
        error!(error = %e, action, "audit write failed");
    }
}

/// Record that `actor_id` read `resource` belonging to `subject_id`.
pub async fn record_access(db: &PgPool, actor_id: Uuid, subject_id: Uuid, resource: &str) {
    let res = sqlx::query(
        r#"
        INSERT INTO access_logs (actor_id, subject_id, resource)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(actor_id)
    .bind(subject_id)
    .bind(resource)
    .execute(db)
    .await;
    if let Err(e) = res {
        error!(error = %e, %actor_id, %subject_id, resource, "access log write failed");
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

pub async fn insert_client_error(
    db: &PgPool,
    user_id: Option<Uuid>,
    report: &ClientErrorReport,
) -> anyhow::Result<()> {
    let clip = |v: &Option<String>| v.as_deref().map(|s| truncate(s, MAX_FIELD_LEN));
    sqlx::query(
        r#"
        INSERT INTO client_errors (user_id, message, stack, url, user_agent)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(truncate(&report.message, MAX_FIELD_LEN))
    .bind(clip(&report.stack))
    .bind(clip(&report.url))
    .bind(clip(&report.user_agent))
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_audit_logs(db: &PgPool, limit: i64) -> anyhow::Result<Vec<AuditLogEntry>> {
    let rows = sqlx::query_as::<_, AuditLogEntry>(
        r#"
        SELECT id, user_id, action, metadata, created_at
          FROM audit_logs
         ORDER BY created_at DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_client_errors(db: &PgPool, limit: i64) -> anyhow::Result<Vec<ClientErrorEntry>> {
    let rows = sqlx::query_as::<_, ClientErrorEntry>(
        r#"
        SELECT id, user_id, message, stack, url, user_agent, created_at
          FROM client_errors
         ORDER BY created_at DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_access_logs(db: &PgPool, limit: i64) -> anyhow::Result<Vec<AccessLogEntry>> {
    let rows = sqlx::query_as::<_, AccessLogEntry>(
        r#"
        SELECT id, actor_id, subject_id, resource, created_at
          FROM access_logs
         ORDER BY created_at DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off
        assert_eq!(truncate("aé", 2), "a");
    }
}
