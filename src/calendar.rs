use chrono::{Datelike, Days, NaiveDate};

/// The five two-hour windows offered each day, in display order.
pub const DAILY_SLOTS: [&str; 5] = ["09:00 AM", "11:00 AM", "01:00 PM", "03:00 PM", "05:00 PM"];

/// Canonical slot label for `time`, if it names one of the daily slots.
pub fn normalize_slot(time: &str) -> Option<&'static str> {
    let wanted = time.trim().to_ascii_uppercase();
    DAILY_SLOTS.iter().copied().find(|slot| *slot == wanted)
}

/// Daily slots minus `booked`, keeping the daily order.
pub fn available_slots(booked: &[String]) -> Vec<String> {
    DAILY_SLOTS
        .iter()
        .filter(|slot| !booked.iter().any(|b| b == *slot))
        .map(|slot| slot.to_string())
        .collect()
}

/// Date boundaries used by the booking statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub today: NaiveDate,
    /// Sunday on or before `today`.
    pub week_start: NaiveDate,
    pub month_start: NaiveDate,
}

impl StatsWindow {
    pub fn for_day(today: NaiveDate) -> Self {
        let since_sunday = u64::from(today.weekday().num_days_from_sunday());
        let week_start = today.checked_sub_days(Days::new(since_sunday)).unwrap_or(today);
        let month_start = today.with_day(1).unwrap_or(today);
        Self {
            today,
            week_start,
            month_start,
        }
    }
}
