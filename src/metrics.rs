//! Small arithmetic used by the tracking endpoints.

use serde::Serialize;
use time::Date;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Percentage of `current` against `target`, rounded and clamped to 0..=100.
/// A non-positive target yields 0.
pub fn calculate_progress(current: f64, target: f64) -> u8 {
    if !(target > 0.0) || !current.is_finite() {
        return 0;
    }
    let pct = (current / target * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroSplit {
    pub protein_pct: u8,
    pub carbs_pct: u8,
    pub fat_pct: u8,
}

impl MacroSplit {
    /// Share of calories contributed by each macro, from grams.
    pub fn from_grams(protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        let protein = protein_g.max(0.0) * KCAL_PER_G_PROTEIN;
        let carbs = carbs_g.max(0.0) * KCAL_PER_G_CARBS;
        let fat = fat_g.max(0.0) * KCAL_PER_G_FAT;
        let total = protein + carbs + fat;
        if !(total > 0.0) {
            return Self {
                protein_pct: 0,
                carbs_pct: 0,
                fat_pct: 0,
            };
        }
        let pct = |kcal: f64| (kcal / total * 100.0).round().clamp(0.0, 100.0) as u8;
        Self {
            protein_pct: pct(protein),
            carbs_pct: pct(carbs),
            fat_pct: pct(fat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}

/// Streaks over completion dates (any order, duplicates allowed) as of `today`.
///
/// Dates after `today` are ignored. `current` is the run of consecutive days
/// ending today, or ending yesterday when today is not done yet; otherwise 0.
pub fn streak(dates: &[Date], today: Date) -> Streak {
    let mut days: Vec<Date> = dates.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(first) = days.first().copied() else {
        return Streak {
            current: 0,
            longest: 0,
        };
    };

    let mut run = 1;
    let mut longest = 1;
    let mut first_run = 1;
    let mut in_first_run = true;
    let mut prev = first;
    for &day in &days[1..] {
        if prev.previous_day() == Some(day) {
            run += 1;
        } else {
            in_first_run = false;
            run = 1;
        }
        if in_first_run {
            first_run = run;
        }
        longest = longest.max(run);
        prev = day;
    }

    let alive = first == today || today.previous_day() == Some(first);
    Streak {
        current: if alive { first_run } else { 0 },
        longest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::Duration;

    #[test]
    fn progress_zero_target() {
        assert_eq!(calculate_progress(5.0, 0.0), 0);
        assert_eq!(calculate_progress(0.0, 0.0), 0);
        assert_eq!(calculate_progress(5.0, -3.0), 0);
    }

    #[test]
    fn progress_clamps() {
        assert_eq!(calculate_progress(50.0, 100.0), 50);
        assert_eq!(calculate_progress(250.0, 100.0), 100);
        assert_eq!(calculate_progress(-10.0, 100.0), 0);
        assert_eq!(calculate_progress(1.0, 3.0), 33);
        assert_eq!(calculate_progress(f64::NAN, 3.0), 0);
    }

    #[test]
    fn progress_always_in_range() {
        for current in [-1e9, -1.0, 0.0, 0.4, 7.0, 99.5, 1e12] {
            for target in [-5.0, 0.0, 0.1, 1.0, 100.0, 1e6] {
                assert!(calculate_progress(current, target) <= 100);
            }
        }
    }

    #[test]
    fn macro_split_zero_calories() {
        let split = MacroSplit::from_grams(0.0, 0.0, 0.0);
        assert_eq!((split.protein_pct, split.carbs_pct, split.fat_pct), (0, 0, 0));
    }

    #[test]
    fn macro_split_weights_fat_higher() {
        // 100 kcal protein, 100 kcal carbs, 180 kcal fat
        let split = MacroSplit::from_grams(25.0, 25.0, 20.0);
        assert_eq!(split.protein_pct, 26);
        assert_eq!(split.carbs_pct, 26);
        assert_eq!(split.fat_pct, 47);
    }

    #[test]
    fn macro_split_ignores_negative_grams() {
        let split = MacroSplit::from_grams(-10.0, 50.0, 0.0);
        assert_eq!(split.carbs_pct, 100);
        assert_eq!(split.protein_pct, 0);
    }

    fn days_back(today: Date, range: std::ops::Range<i64>) -> Vec<Date> {
        range.map(|i| today - Duration::days(i)).collect()
    }

    #[test]
    fn streak_empty_and_single() {
        let today = date!(2024 - 05 - 10);
        assert_eq!(streak(&[], today), Streak { current: 0, longest: 0 });
        let s = streak(&[today], today);
        assert_eq!((s.current, s.longest), (1, 1));
    }

    #[test]
    fn streak_consecutive_days_ending_today() {
        let today = date!(2024 - 05 - 10);
        assert_eq!(streak(&days_back(today, 0..5), today).current, 5);
    }

    #[test]
    fn streak_ending_yesterday_is_still_current() {
        let today = date!(2024 - 05 - 10);
        let s = streak(&days_back(today, 1..4), today);
        assert_eq!((s.current, s.longest), (3, 3));
    }

    #[test]
    fn streak_that_ended_weeks_ago_is_not_current() {
        let today = date!(2024 - 05 - 10);
        let s = streak(&days_back(today, 30..40), today);
        assert_eq!(s.current, 0);
        assert_eq!(s.longest, 10);
    }

    #[test]
    fn future_dates_do_not_break_the_run() {
        let today = date!(2024 - 05 - 10);
        let mut days = days_back(today, 0..3);
        days.push(today + Duration::days(5));
        let s = streak(&days, today);
        assert_eq!((s.current, s.longest), (3, 3));
    }

    #[test]
    fn streak_resets_on_gap() {
        let today = date!(2024 - 05 - 10);
        let days = [today, today - Duration::days(1), today - Duration::days(3)];
        let s = streak(&days, today);
        assert_eq!(s.current, 2);
        assert_eq!(s.longest, 2);
    }

    #[test]
    fn streak_longest_can_be_older_run() {
        let today = date!(2024 - 05 - 10);
        let mut days = vec![today];
        days.extend(days_back(today, 3..7));
        days.push(today); // duplicate
        let s = streak(&days, today);
        assert_eq!(s.current, 1);
        assert_eq!(s.longest, 4);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let days = [date!(2024 - 03 - 01), date!(2024 - 02 - 29), date!(2024 - 02 - 28)];
        assert_eq!(streak(&days, date!(2024 - 03 - 01)).current, 3);
    }
}
