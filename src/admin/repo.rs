use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{AdminUserRow, FeatureCounts, TopUser, UsageStats};
use crate::auth::repo_types::Role;

const TOP_USERS: i64 = 10;

/// Start of the current UTC day, whatever the session TimeZone is.
const UTC_MIDNIGHT: &str = "(date_trunc('day', now() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC')";

async fn count(db: &PgPool, sql: &str) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await?)
}

async fn events_since(db: &PgPool, days: i32) -> anyhow::Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM audit_logs \
         WHERE created_at >= {UTC_MIDNIGHT} - make_interval(days => $1)"
    );
    let n = sqlx::query_scalar::<_, i64>(&sql)
        .bind(days)
        .fetch_one(db)
        .await?;
    Ok(n)
}

async fn active_users_since(db: &PgPool, days: i32) -> anyhow::Result<i64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT user_id) FROM audit_logs \
         WHERE user_id IS NOT NULL \
           AND created_at >= {UTC_MIDNIGHT} - make_interval(days => $1)"
    );
    let n = sqlx::query_scalar::<_, i64>(&sql)
        .bind(days)
        .fetch_one(db)
        .await?;
    Ok(n)
}

async fn top_users(db: &PgPool) -> anyhow::Result<Vec<TopUser>> {
    let rows = sqlx::query_as::<_, TopUser>(
        r#"
        SELECT u.id AS user_id, u.email, u.display_name,
               COALESCE(c.n, 0) AS conversations,
               COALESCE(r.n, 0) AS routine_sessions,
               COALESCE(c.n, 0) + COALESCE(r.n, 0) AS total
          FROM users u
          LEFT JOIN (SELECT user_id, COUNT(*) AS n FROM conversation_sessions GROUP BY user_id) c
            ON c.user_id = u.id
          LEFT JOIN (SELECT user_id, COUNT(*) AS n FROM routine_sessions GROUP BY user_id) r
            ON r.user_id = u.id
         WHERE COALESCE(c.n, 0) + COALESCE(r.n, 0) > 0
         ORDER BY total DESC, u.email ASC
         LIMIT $1
        "#,
    )
    .bind(TOP_USERS)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Usage statistics from independent queries run one after another.
/// "Today" starts at midnight UTC; the 7/30 day windows extend back from there.
pub async fn usage_stats(db: &PgPool) -> anyhow::Result<UsageStats> {
    let features = FeatureCounts {
        conversations: count(db, "SELECT COUNT(*) FROM conversation_sessions").await?,
        messages: count(db, "SELECT COUNT(*) FROM conversation_messages").await?,
        mood_entries: count(db, "SELECT COUNT(*) FROM mood_entries").await?,
        nutrition_plans: count(db, "SELECT COUNT(*) FROM nutrition_plans").await?,
        nutrition_logs: count(db, "SELECT COUNT(*) FROM nutrition_logs").await?,
        routine_sessions: count(db, "SELECT COUNT(*) FROM routine_sessions").await?,
        care_plan_tasks: count(db, "SELECT COUNT(*) FROM care_plan_tasks").await?,
        care_team_members: count(db, "SELECT COUNT(*) FROM care_team_members").await?,
    };
    Ok(UsageStats {
        total_users: count(db, "SELECT COUNT(*) FROM users").await?,
        active_users: count(db, "SELECT COUNT(*) FROM users WHERE is_active").await?,
        total_events: count(db, "SELECT COUNT(*) FROM audit_logs").await?,
        events_today: events_since(db, 0).await?,
        events_7d: events_since(db, 7).await?,
        events_30d: events_since(db, 30).await?,
        active_users_today: active_users_since(db, 0).await?,
        active_users_7d: active_users_since(db, 7).await?,
        active_users_30d: active_users_since(db, 30).await?,
        features,
        top_users: top_users(db).await?,
    })
}

/// Page of users matching `search` on email or display name, plus the match count.
pub async fn list_users(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<AdminUserRow>, i64)> {
    let pattern = search.map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));
    let rows = sqlx::query_as::<_, AdminUserRow>(
        r#"
        SELECT id, email, display_name, role, is_active, created_at
          FROM users
         WHERE $1::text IS NULL OR email ILIKE $1 OR display_name ILIKE $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
         WHERE $1::text IS NULL OR email ILIKE $1 OR display_name ILIKE $1
        "#,
    )
    .bind(pattern.as_deref())
    .fetch_one(db)
    .await?;
    Ok((rows, total))
}

pub async fn set_role(db: &PgPool, user_id: Uuid, role: Role) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"UPDATE users SET role = $2, updated_at = now() WHERE id = $1"#)
        .bind(user_id)
        .bind(role.as_str())
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
