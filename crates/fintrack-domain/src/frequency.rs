//! Recurrence cadences and the calendar arithmetic that advances a cursor.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ScheduleError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Enumerates the supported recurrence cadences.
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    /// Stable storage code, e.g. `MONTHLY`.
    pub fn code(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Biweekly => "BIWEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Quarterly => "QUARTERLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Bi-weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Calculates the occurrence that follows `current`.
    pub fn next_date(self, current: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        advance_date(current, self)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase().replace(['-', '_', ' '], "");
        Frequency::ALL
            .into_iter()
            .find(|frequency| frequency.code() == normalized)
            .ok_or_else(|| ScheduleError::InvalidFrequency(value.to_string()))
    }
}

/// Advances `current` by one period of `frequency`.
///
/// Day-based cadences add a fixed number of days. Month-based cadences keep the
/// day-of-month and clamp it to the last valid day of the target month, so
/// Jan 31 + MONTHLY lands on Feb 28/29 and Feb 29 + YEARLY lands on Feb 28.
pub fn advance_date(current: NaiveDate, frequency: Frequency) -> Result<NaiveDate, ScheduleError> {
    match frequency {
        Frequency::Daily => add_days(current, 1),
        Frequency::Weekly => add_days(current, 7),
        Frequency::Biweekly => add_days(current, 14),
        Frequency::Monthly => shift_month(current, 1),
        Frequency::Quarterly => shift_month(current, 3),
        Frequency::Yearly => shift_month(current, 12),
    }
}

/// Number of days in `month` of `year`, or `None` for a month outside 1..=12.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Some(31),
        4 | 6 | 9 | 11 => Some(30),
        2 if is_leap_year(year) => Some(29),
        2 => Some(28),
        _ => None,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, ScheduleError> {
    date.checked_add_signed(Duration::days(days))
        .ok_or(ScheduleError::CalendarOverflow(date))
}

fn shift_month(date: NaiveDate, months: u32) -> Result<NaiveDate, ScheduleError> {
    let overflow = || ScheduleError::CalendarOverflow(date);
    let index = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let year = i32::try_from(index.div_euclid(12)).map_err(|_| overflow())?;
    let month = (index.rem_euclid(12) + 1) as u32;
    let last_day = days_in_month(year, month).ok_or_else(overflow)?;
    NaiveDate::from_ymd_opt(year, month, date.day().min(last_day)).ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_based_frequencies_add_fixed_days() {
        let start = date(2024, 12, 25);
        assert_eq!(advance_date(start, Frequency::Daily), Ok(date(2024, 12, 26)));
        assert_eq!(advance_date(start, Frequency::Weekly), Ok(date(2025, 1, 1)));
        assert_eq!(advance_date(start, Frequency::Biweekly), Ok(date(2025, 1, 8)));
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        assert_eq!(
            advance_date(date(2024, 1, 31), Frequency::Monthly),
            Ok(date(2024, 2, 29))
        );
        assert_eq!(
            advance_date(date(2023, 1, 31), Frequency::Monthly),
            Ok(date(2023, 2, 28))
        );
        assert_eq!(
            advance_date(date(2024, 3, 31), Frequency::Monthly),
            Ok(date(2024, 4, 30))
        );
    }

    #[test]
    fn monthly_rolls_over_december() {
        assert_eq!(
            advance_date(date(2024, 12, 15), Frequency::Monthly),
            Ok(date(2025, 1, 15))
        );
    }

    #[test]
    fn quarterly_rolls_year_and_clamps() {
        assert_eq!(
            advance_date(date(2024, 11, 30), Frequency::Quarterly),
            Ok(date(2025, 2, 28))
        );
        assert_eq!(
            advance_date(date(2024, 10, 31), Frequency::Quarterly),
            Ok(date(2025, 1, 31))
        );
    }

    #[test]
    fn yearly_leap_day_falls_back_to_feb_28() {
        assert_eq!(
            advance_date(date(2024, 2, 29), Frequency::Yearly),
            Ok(date(2025, 2, 28))
        );
        assert_eq!(
            advance_date(date(2023, 2, 28), Frequency::Yearly),
            Ok(date(2024, 2, 28))
        );
    }

    #[test]
    fn overflow_at_calendar_limit_is_reported() {
        let last = NaiveDate::MAX;
        assert_eq!(
            advance_date(last, Frequency::Daily),
            Err(ScheduleError::CalendarOverflow(last))
        );
        assert_eq!(
            advance_date(last, Frequency::Monthly),
            Err(ScheduleError::CalendarOverflow(last))
        );
    }

    #[test]
    fn parses_storage_codes_case_insensitively() {
        assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!("Bi-Weekly".parse::<Frequency>(), Ok(Frequency::Biweekly));
        assert_eq!(
            "FORTNIGHTLY".parse::<Frequency>(),
            Err(ScheduleError::InvalidFrequency("FORTNIGHTLY".into()))
        );
    }

    #[test]
    fn serializes_as_screaming_codes() {
        let json = serde_json::to_string(&Frequency::Biweekly).unwrap();
        assert_eq!(json, "\"BIWEEKLY\"");
    }
}
