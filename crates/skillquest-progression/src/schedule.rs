//! Repeat schedules for recurring quests.
//!
//! A schedule is validated once, when the quest is created, into a
//! [`ValidSchedule`]. The maintenance sweep then asks it for the first
//! occurrence after a progress row was last closed; once that instant has
//! passed, the row reopens.
//!
//! All times are UTC. Monthly schedules on a day the month lacks (for
//! example the 31st in April) fire on the month's last day.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};
use skillquest_types::{QuestProgress, RepeatInterval, RepeatSchedule};

use crate::error::ProgressionError;

/// A schedule whose fields are known to be complete and in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidSchedule {
    /// Recurrence interval.
    pub interval: RepeatInterval,
    /// Time of day.
    pub time: NaiveTime,
    /// Weekday, for weekly schedules.
    pub weekday: Option<Weekday>,
    /// Day of month, for monthly schedules.
    pub day_of_month: Option<u32>,
}

fn invalid(reason: &str) -> ProgressionError {
    ProgressionError::InvalidSchedule {
        reason: reason.to_owned(),
    }
}

/// Parse a strict `HH:MM` time of day.
pub fn parse_time(text: &str) -> Result<NaiveTime, ProgressionError> {
    if text.len() != 5 {
        return Err(invalid("time must use the HH:MM format"));
    }
    NaiveTime::parse_from_str(text, "%H:%M")
        .map_err(|e| invalid(&format!("time must use the HH:MM format: {e}")))
}

/// Validate a raw schedule.
///
/// Weekly schedules need `day_of_week` in `0..=6` (0 is Sunday); monthly
/// schedules need `day_of_month` in `1..=31`.
pub fn validate(schedule: &RepeatSchedule) -> Result<ValidSchedule, ProgressionError> {
    let time = parse_time(&schedule.time)?;
    let mut valid = ValidSchedule {
        interval: schedule.interval,
        time,
        weekday: None,
        day_of_month: None,
    };

    match schedule.interval {
        RepeatInterval::Daily => {}
        RepeatInterval::Weekly => {
            let day = schedule
                .day_of_week
                .ok_or_else(|| invalid("weekly quests need day_of_week (0-6)"))?;
            valid.weekday = Some(weekday_from_sunday(day)?);
        }
        RepeatInterval::Monthly => {
            let day = schedule
                .day_of_month
                .filter(|d| (1..=31).contains(d))
                .ok_or_else(|| invalid("monthly quests need day_of_month (1-31)"))?;
            valid.day_of_month = Some(u32::from(day));
        }
    }
    Ok(valid)
}

fn weekday_from_sunday(day: u8) -> Result<Weekday, ProgressionError> {
    match day {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(invalid("weekly quests need day_of_week (0-6)")),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month >= 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month.checked_add(1)?)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

fn monthly_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.min(last_day_of_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

impl ValidSchedule {
    fn at(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(self.time).and_utc()
    }

    /// The first scheduled instant strictly after `after`.
    ///
    /// `None` only when the date leaves chrono's supported range.
    pub fn next_occurrence_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = after.date_naive();
        match self.interval {
            RepeatInterval::Daily => {
                let candidate = self.at(today);
                if candidate > after {
                    Some(candidate)
                } else {
                    Some(self.at(today.checked_add_days(Days::new(1))?))
                }
            }
            RepeatInterval::Weekly => {
                let target = self.weekday?.num_days_from_sunday();
                let current = today.weekday().num_days_from_sunday();
                let ahead = (target.checked_add(7)?.checked_sub(current)?) % 7;
                let candidate = self.at(today.checked_add_days(Days::new(u64::from(ahead)))?);
                if candidate > after {
                    Some(candidate)
                } else {
                    let week_later = u64::from(ahead).checked_add(7)?;
                    Some(self.at(today.checked_add_days(Days::new(week_later))?))
                }
            }
            RepeatInterval::Monthly => {
                let day = self.day_of_month?;
                let candidate = self.at(monthly_date(today.year(), today.month(), day)?);
                if candidate > after {
                    return Some(candidate);
                }
                let (year, month) = if today.month() >= 12 {
                    (today.year().checked_add(1)?, 1)
                } else {
                    (today.year(), today.month().checked_add(1)?)
                };
                Some(self.at(monthly_date(year, month, day)?))
            }
        }
    }

    /// Whether a row closed at `closed_at` is due to reopen at `now`.
    pub fn is_due(&self, closed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.next_occurrence_after(closed_at)
            .is_some_and(|next| next <= now)
    }
}

/// The instant a closed progress row's next cycle is counted from.
///
/// Last completion first, then the grading time, then the start time.
pub fn reopen_anchor(progress: &QuestProgress) -> Option<DateTime<Utc>> {
    progress
        .last_completed_at
        .or(progress.graded_at)
        .or(progress.submitted_at)
        .or(progress.started_at)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn schedule(interval: RepeatInterval, time: &str) -> RepeatSchedule {
        RepeatSchedule {
            interval,
            time: time.to_owned(),
            day_of_week: None,
            day_of_month: None,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn time_must_be_strict_hh_mm() {
        assert!(parse_time("08:30").is_ok());
        assert!(parse_time("23:59").is_ok());
        assert!(parse_time("8:30").is_err());
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("12:00:00").is_err());
    }

    #[test]
    fn weekly_needs_a_weekday() {
        let mut raw = schedule(RepeatInterval::Weekly, "09:00");
        assert!(validate(&raw).is_err());
        raw.day_of_week = Some(7);
        assert!(validate(&raw).is_err());
        raw.day_of_week = Some(0);
        assert_eq!(validate(&raw).unwrap().weekday, Some(Weekday::Sun));
    }

    #[test]
    fn monthly_needs_a_day_in_range() {
        let mut raw = schedule(RepeatInterval::Monthly, "09:00");
        assert!(validate(&raw).is_err());
        raw.day_of_month = Some(0);
        assert!(validate(&raw).is_err());
        raw.day_of_month = Some(32);
        assert!(validate(&raw).is_err());
        raw.day_of_month = Some(31);
        assert_eq!(validate(&raw).unwrap().day_of_month, Some(31));
    }

    // -----------------------------------------------------------------------
    // Next occurrence
    // -----------------------------------------------------------------------

    #[test]
    fn daily_fires_later_today_or_tomorrow() {
        let s = validate(&schedule(RepeatInterval::Daily, "08:00")).unwrap();
        assert_eq!(
            s.next_occurrence_after(utc(2025, 3, 10, 7, 0)),
            Some(utc(2025, 3, 10, 8, 0))
        );
        assert_eq!(
            s.next_occurrence_after(utc(2025, 3, 10, 8, 0)),
            Some(utc(2025, 3, 11, 8, 0))
        );
    }

    #[test]
    fn weekly_finds_the_next_weekday() {
        let mut raw = schedule(RepeatInterval::Weekly, "10:00");
        raw.day_of_week = Some(1);
        let s = validate(&raw).unwrap();
        // 2025-03-12 is a Wednesday
        assert_eq!(
            s.next_occurrence_after(utc(2025, 3, 12, 12, 0)),
            Some(utc(2025, 3, 17, 10, 0))
        );
        // Monday before and after the scheduled time
        assert_eq!(
            s.next_occurrence_after(utc(2025, 3, 17, 9, 0)),
            Some(utc(2025, 3, 17, 10, 0))
        );
        assert_eq!(
            s.next_occurrence_after(utc(2025, 3, 17, 10, 0)),
            Some(utc(2025, 3, 24, 10, 0))
        );
    }

    #[test]
    fn monthly_clamps_to_the_last_day() {
        let mut raw = schedule(RepeatInterval::Monthly, "06:00");
        raw.day_of_month = Some(31);
        let s = validate(&raw).unwrap();
        assert_eq!(
            s.next_occurrence_after(utc(2025, 4, 2, 0, 0)),
            Some(utc(2025, 4, 30, 6, 0))
        );
        assert_eq!(
            s.next_occurrence_after(utc(2024, 1, 31, 7, 0)),
            Some(utc(2024, 2, 29, 6, 0))
        );
        assert_eq!(
            s.next_occurrence_after(utc(2025, 12, 31, 7, 0)),
            Some(utc(2026, 1, 31, 6, 0))
        );
    }

    #[test]
    fn due_once_the_next_occurrence_passed() {
        let s = validate(&schedule(RepeatInterval::Daily, "08:00")).unwrap();
        let closed = utc(2025, 3, 10, 9, 0);
        assert!(!s.is_due(closed, utc(2025, 3, 11, 7, 59)));
        assert!(s.is_due(closed, utc(2025, 3, 11, 8, 0)));
    }
}
