use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::calendar::iso_date;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NutritionPlan {
    pub id: Uuid,
    pub goal: String,
    pub daily_calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NutritionLog {
    pub id: Uuid,
    #[serde(with = "iso_date")]
    pub logged_on: Date,
    pub meal: String,
    pub description: Option<String>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
