use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{NutritionLog, NutritionPlan};
use crate::{
    calendar::iso_date,
    metrics::{calculate_progress, MacroSplit},
};

#[derive(Debug, Deserialize)]
pub struct StartPlanRequest {
    pub goal: String,
    pub daily_calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    pub meal: String,
    pub description: Option<String>,
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default, with = "iso_date::option")]
    pub logged_on: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Totals {
    pub fn of(logs: &[NutritionLog]) -> Self {
        logs.iter().fold(Self::default(), |acc, l| Self {
            calories: acc.calories + l.calories,
            protein_g: acc.protein_g + l.protein_g,
            carbs_g: acc.carbs_g + l.carbs_g,
            fat_g: acc.fat_g + l.fat_g,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DailySummary {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub totals: Totals,
    pub macros: MacroSplit,
    pub plan: Option<NutritionPlan>,
    /// Percent of the plan's calorie target reached; 0 without a plan.
    pub calorie_progress: u8,
    pub remaining_calories: Option<f64>,
    pub logs: Vec<NutritionLog>,
}

impl DailySummary {
    pub fn build(date: Date, logs: Vec<NutritionLog>, plan: Option<NutritionPlan>) -> Self {
        let totals = Totals::of(&logs);
        let macros = MacroSplit::from_grams(totals.protein_g, totals.carbs_g, totals.fat_g);
        let target = plan.as_ref().map(|p| p.daily_calories).unwrap_or(0.0);
        let remaining_calories = plan
            .as_ref()
            .map(|p| (p.daily_calories - totals.calories).max(0.0));
        Self {
            date,
            totals,
            macros,
            calorie_progress: calculate_progress(totals.calories, target),
            remaining_calories,
            plan,
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn log(calories: f64, p: f64, c: f64, f: f64) -> NutritionLog {
        NutritionLog {
            id: Uuid::new_v4(),
            logged_on: date!(2024 - 06 - 01),
            meal: "lunch".into(),
            description: None,
            calories,
            protein_g: p,
            carbs_g: c,
            fat_g: f,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn plan(daily: f64) -> NutritionPlan {
        NutritionPlan {
            id: Uuid::new_v4(),
            goal: "maintain".into(),
            daily_calories: daily,
            protein_g: 100.0,
            carbs_g: 200.0,
            fat_g: 60.0,
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_day_is_all_zero() {
        let s = DailySummary::build(date!(2024 - 06 - 01), vec![], None);
        assert_eq!(s.totals, Totals::default());
        assert_eq!((s.macros.protein_pct, s.macros.carbs_pct, s.macros.fat_pct), (0, 0, 0));
        assert_eq!(s.calorie_progress, 0);
        assert_eq!(s.remaining_calories, None);
    }

    #[test]
    fn totals_and_progress_against_plan() {
        let logs = vec![log(500.0, 25.0, 50.0, 20.0), log(500.0, 25.0, 50.0, 20.0)];
        let s = DailySummary::build(date!(2024 - 06 - 01), logs, Some(plan(2000.0)));
        assert_eq!(s.totals.calories, 1000.0);
        assert_eq!(s.calorie_progress, 50);
        assert_eq!(s.remaining_calories, Some(1000.0));
    }

    #[test]
    fn overshoot_clamps_progress_and_remaining() {
        let s = DailySummary::build(
            date!(2024 - 06 - 01),
            vec![log(2500.0, 0.0, 0.0, 0.0)],
            Some(plan(2000.0)),
        );
        assert_eq!(s.calorie_progress, 100);
        assert_eq!(s.remaining_calories, Some(0.0));
    }

    #[test]
    fn zero_calorie_plan_has_zero_progress() {
        let s = DailySummary::build(date!(2024 - 06 - 01), vec![log(300.0, 0.0, 0.0, 0.0)], Some(plan(0.0)));
        assert_eq!(s.calorie_progress, 0);
    }

    #[test]
    fn optional_date_query_parses() {
        let q: SummaryQuery = serde_json::from_str(r#"{"date":"2024-02-29"}"#).unwrap();
        assert_eq!(q.date, Some(date!(2024 - 02 - 29)));
        let q: SummaryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.date, None);
    }
}
