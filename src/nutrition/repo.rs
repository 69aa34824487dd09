use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::{
    dto::{LogMealRequest, StartPlanRequest},
    repo_types::{NutritionLog, NutritionPlan},
};

const PLAN_COLUMNS: &str =
    "id, goal, daily_calories, protein_g, carbs_g, fat_g, is_active, created_at";
const LOG_COLUMNS: &str =
    "id, logged_on, meal, description, calories, protein_g, carbs_g, fat_g, created_at";

/// Deactivates the current plan and inserts the new one in one transaction.
/// The partial unique index on active plans turns a concurrent start into an error
/// instead of two active plans.
pub async fn start_plan(
    db: &PgPool,
    user_id: Uuid,
    req: &StartPlanRequest,
) -> anyhow::Result<NutritionPlan> {
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"
        UPDATE nutrition_plans
           SET is_active = FALSE, updated_at = now()
         WHERE user_id = $1 AND is_active
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let sql = format!(
        "INSERT INTO nutrition_plans (user_id, goal, daily_calories, protein_g, carbs_g, fat_g) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PLAN_COLUMNS}"
    );
    let plan = sqlx::query_as::<_, NutritionPlan>(&sql)
        .bind(user_id)
        .bind(req.goal.trim())
        .bind(req.daily_calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(plan)
}

pub async fn active_plan(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<NutritionPlan>> {
    let sql = format!("SELECT {PLAN_COLUMNS} FROM nutrition_plans WHERE user_id = $1 AND is_active");
    let plan = sqlx::query_as::<_, NutritionPlan>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(plan)
}

pub async fn insert_log(
    db: &PgPool,
    user_id: Uuid,
    day: Date,
    req: &LogMealRequest,
) -> anyhow::Result<NutritionLog> {
    let sql = format!(
        "INSERT INTO nutrition_logs \
             (user_id, logged_on, meal, description, calories, protein_g, carbs_g, fat_g) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {LOG_COLUMNS}"
    );
    let log = sqlx::query_as::<_, NutritionLog>(&sql)
        .bind(user_id)
        .bind(day)
        .bind(req.meal.trim())
        .bind(req.description.as_deref())
        .bind(req.calories)
        .bind(req.protein_g)
        .bind(req.carbs_g)
        .bind(req.fat_g)
        .fetch_one(db)
        .await?;
    Ok(log)
}

pub async fn logs_for_day(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<Vec<NutritionLog>> {
    let sql = format!(
        "SELECT {LOG_COLUMNS} FROM nutrition_logs \
         WHERE user_id = $1 AND logged_on = $2 ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, NutritionLog>(&sql)
        .bind(user_id)
        .bind(day)
        .fetch_all(db)
        .await?;
    Ok(rows)
}
