use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::dto::{CareTeamMember, CreateMemberRequest, UpdateMemberRequest};

const MEMBER_COLUMNS: &str = "id, name, role, email, phone, is_primary, created_at";

async fn clear_primary_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    except: Option<Uuid>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE care_team_members
           SET is_primary = FALSE, updated_at = now()
         WHERE user_id = $1 AND is_primary AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(user_id)
    .bind(except)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CareTeamMember>> {
    let sql = format!(
        "SELECT {MEMBER_COLUMNS} FROM care_team_members \
         WHERE user_id = $1 ORDER BY is_primary DESC, name ASC"
    );
    let rows = sqlx::query_as::<_, CareTeamMember>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateMemberRequest,
) -> anyhow::Result<CareTeamMember> {
    let mut tx = db.begin().await?;
    if req.is_primary {
        clear_primary_tx(&mut tx, user_id, None).await?;
    }
    let sql = format!(
        "INSERT INTO care_team_members (user_id, name, role, email, phone, is_primary) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MEMBER_COLUMNS}"
    );
    let member = sqlx::query_as::<_, CareTeamMember>(&sql)
        .bind(user_id)
        .bind(req.name.trim())
        .bind(req.role.trim())
        .bind(req.email.as_deref())
        .bind(req.phone.as_deref())
        .bind(req.is_primary)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(member)
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    member_id: Uuid,
    req: &UpdateMemberRequest,
) -> anyhow::Result<Option<CareTeamMember>> {
    let mut tx = db.begin().await?;
    if req.is_primary == Some(true) {
        clear_primary_tx(&mut tx, user_id, Some(member_id)).await?;
    }
    let sql = format!(
        "UPDATE care_team_members SET \
             name = COALESCE($3, name), \
             role = COALESCE($4, role), \
             email = COALESCE($5, email), \
             phone = COALESCE($6, phone), \
             is_primary = COALESCE($7, is_primary), \
             updated_at = now() \
         WHERE id = $1 AND user_id = $2 RETURNING {MEMBER_COLUMNS}"
    );
    let member = sqlx::query_as::<_, CareTeamMember>(&sql)
        .bind(member_id)
        .bind(user_id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.role.as_deref().map(str::trim))
        .bind(req.email.as_deref())
        .bind(req.phone.as_deref())
        .bind(req.is_primary)
        .fetch_optional(&mut *tx)
        .await?;
    // an unknown id rolls back the cleared primary flag
    if member.is_some() {
        tx.commit().await?;
    }
    Ok(member)
}

pub async fn delete(db: &PgPool, user_id: Uuid, member_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM care_team_members WHERE id = $1 AND user_id = $2"#)
        .bind(member_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
