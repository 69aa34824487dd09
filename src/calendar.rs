//! Local-time helpers. Users store a fixed UTC offset in minutes; "today" and
//! the time-of-day bucket are derived from it.

use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;

pub fn is_valid_offset(minutes: i32) -> bool {
    (-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes)
}

/// Offset for a stored minute value; anything unrepresentable falls back to UTC.
pub fn user_offset(minutes: i32) -> UtcOffset {
    if !is_valid_offset(minutes) {
        return UtcOffset::UTC;
    }
    UtcOffset::from_whole_seconds(minutes * 60).unwrap_or(UtcOffset::UTC)
}

pub fn local_now(offset_minutes: i32) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(user_offset(offset_minutes))
}

pub fn local_today(offset_minutes: i32) -> Date {
    local_now(offset_minutes).date()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub fn from_hour(hour: u8) -> Self {
        match hour {
            0..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }

    pub fn salutation(self) -> &'static str {
        match self {
            DayPart::Morning => "Good morning",
            DayPart::Afternoon => "Good afternoon",
            DayPart::Evening => "Good evening",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn day_part_boundaries() {
        assert_eq!(DayPart::from_hour(0), DayPart::Morning);
        assert_eq!(DayPart::from_hour(11), DayPart::Morning);
        assert_eq!(DayPart::from_hour(12), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(16), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(17), DayPart::Evening);
        assert_eq!(DayPart::from_hour(23), DayPart::Evening);
    }

    #[test]
    fn offset_shifts_local_date() {
        let utc = datetime!(2024-03-01 23:30 UTC);
        assert_eq!(utc.to_offset(user_offset(60)).date(), date!(2024 - 03 - 02));
        assert_eq!(utc.to_offset(user_offset(-300)).date(), date!(2024 - 03 - 01));
    }

    #[test]
    fn out_of_range_offset_is_utc() {
        assert_eq!(user_offset(15 * 60), UtcOffset::UTC);
        assert!(!is_valid_offset(-15 * 60));
        assert!(is_valid_offset(-12 * 60));
    }

    #[test]
    fn iso_date_serializes_plainly() {
        #[derive(Serialize)]
        struct Row {
            #[serde(with = "iso_date")]
            day: Date,
        }
        let json = serde_json::to_string(&Row { day: date!(2024 - 01 - 05) }).unwrap();
        assert_eq!(json, r#"{"day":"2024-01-05"}"#);
    }
}
