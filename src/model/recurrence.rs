// File: ./src/model/recurrence.rs
use crate::model::due::{DueSpec, RecurrencePattern};
use chrono::{Days, Months, NaiveDate, NaiveDateTime, Weekday};
use rrule::RRuleSet;
use std::str::FromStr;

pub struct RecurrenceEngine;

impl RecurrenceEngine {
    /// First date strictly after `after` that the pattern allows.
    pub fn next_date(pattern: &RecurrencePattern, after: NaiveDate) -> Option<NaiveDate> {
        match pattern {
            RecurrencePattern::EveryNDays(n) => after.checked_add_days(Days::new(u64::from(*n))),
            RecurrencePattern::EveryNWeeks(n, days) if days.is_empty() => {
                after.checked_add_days(Days::new(u64::from(*n) * 7))
            }
            RecurrencePattern::EveryNWeeks(n, days) => Self::next_weekly(after, *n, days),
            RecurrencePattern::EveryNMonths(n) => after.checked_add_months(Months::new(*n)),
            RecurrencePattern::EveryNYears(n) => {
                after.checked_add_months(Months::new(n.checked_mul(12)?))
            }
            RecurrencePattern::Weekdays(days) => Self::next_weekly(after, 1, days),
        }
    }

    /// Builds the occurrence that follows a completion. The next date is computed
    /// from the completion day, not from the previous anchor, so a late
    /// completion never yields a date that is already due. Time of day is kept.
    /// Returns `None` for non-recurring specs.
    pub fn advance(due: &DueSpec, completed_at: NaiveDateTime) -> Option<DueSpec> {
        let pattern = due.recurrence()?;
        let next = Self::next_date(pattern, completed_at.date())?;
        Some(DueSpec::recurring(next, due.time(), pattern.clone()))
    }

    /// Weekly rules with a weekday set go through an RRULE so that intervals
    /// larger than one week skip whole weeks the same way calendar clients do.
    fn next_weekly(after: NaiveDate, interval: u32, days: &[Weekday]) -> Option<NaiveDate> {
        if days.is_empty() {
            return None;
        }
        let by_day = days
            .iter()
            .map(|d| rrule_day_code(*d))
            .collect::<Vec<_>>()
            .join(",");
        let rule = format!(
            "DTSTART:{}T000000Z\nRRULE:FREQ=WEEKLY;INTERVAL={};BYDAY={}\n",
            after.format("%Y%m%d"),
            interval.max(1),
            by_day
        );

        match RRuleSet::from_str(&rule) {
            Ok(set) => set
                .into_iter()
                .map(|d| d.to_utc().date_naive())
                .find(|d| *d > after),
            Err(e) => {
                log::warn!("Failed to build recurrence rule '{}': {}", rule.trim(), e);
                None
            }
        }
    }
}

fn rrule_day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
