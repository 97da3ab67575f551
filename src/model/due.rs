// File: ./src/model/due.rs
//
// Due-date attribute values. The grammar is persisted in user files, so it must
// stay stable:
//
//   2023-01-10              plain date
//   2023-01-10T14:30        plain date with time
//   2023-01-10|e3d          recurring, anchored (e<N>d|w|m|y)
//   2023-01-10|mon,wed      recurring on weekdays, anchored
//   e2w:mon,thu             every 2 weeks on the given days, bare
//   fri                     bare weekday rule
//   +2d                     relative offset, resolved against "now" at parse time
use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DueParseError {
    #[error("empty due date")]
    Empty,
    #[error("invalid date '{0}'")]
    BadDate(String),
    #[error("invalid time '{0}'")]
    BadTime(String),
    #[error("invalid recurrence '{0}'")]
    BadRecurrence(String),
    #[error("invalid offset '{0}'")]
    BadOffset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueKind {
    Plain,
    Recurring,
}

/// Classification of a due date against "now". Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DueState {
    NotDue,
    Due,
    Overdue,
    Invalid,
}

impl DueState {
    /// Position in the default sort order.
    pub fn rank(state: Option<DueState>) -> u8 {
        match state {
            Some(DueState::Overdue) => 0,
            Some(DueState::Due) => 1,
            Some(DueState::NotDue) => 2,
            Some(DueState::Invalid) => 3,
            None => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrencePattern {
    EveryNDays(u32),
    /// An empty weekday list means "same weekday as the anchor".
    EveryNWeeks(u32, Vec<Weekday>),
    EveryNMonths(u32),
    EveryNYears(u32),
    Weekdays(Vec<Weekday>),
}

impl RecurrencePattern {
    pub fn parse(input: &str) -> Result<Self, DueParseError> {
        let lower = input.trim().to_ascii_lowercase();
        let bad = || DueParseError::BadRecurrence(input.to_string());

        if let Some(rest) = lower.strip_prefix('e') {
            let (body, days) = match rest.split_once(':') {
                Some((body, days)) => (body, Some(parse_weekday_list(days).ok_or_else(bad)?)),
                None => (rest, None),
            };
            let unit_idx = body.find(|c: char| !c.is_ascii_digit()).ok_or_else(bad)?;
            let (amount, unit) = body.split_at(unit_idx);
            let n: u32 = amount.parse().map_err(|_| bad())?;
            if n == 0 {
                return Err(bad());
            }
            return match (unit, days) {
                ("d", None) => Ok(Self::EveryNDays(n)),
                ("w", days) => Ok(Self::EveryNWeeks(n, days.unwrap_or_default())),
                ("m", None) => Ok(Self::EveryNMonths(n)),
                ("y", None) => Ok(Self::EveryNYears(n)),
                _ => Err(bad()),
            };
        }

        parse_weekday_list(&lower)
            .map(Self::Weekdays)
            .ok_or_else(bad)
    }

    pub fn weekdays(&self) -> &[Weekday] {
        match self {
            Self::Weekdays(days) | Self::EveryNWeeks(_, days) => days,
            _ => &[],
        }
    }

    /// Anchor for a bare rule: the first allowed day on or after `today`.
    pub fn first_on_or_after(&self, today: NaiveDate) -> NaiveDate {
        let days = self.weekdays();
        if days.is_empty() {
            return today;
        }
        today
            .iter_days()
            .take(7)
            .find(|d| days.contains(&d.weekday()))
            .unwrap_or(today)
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EveryNDays(n) => write!(f, "e{}d", n),
            Self::EveryNWeeks(n, days) if days.is_empty() => write!(f, "e{}w", n),
            Self::EveryNWeeks(n, days) => write!(f, "e{}w:{}", n, format_weekday_list(days)),
            Self::EveryNMonths(n) => write!(f, "e{}m", n),
            Self::EveryNYears(n) => write!(f, "e{}y", n),
            Self::Weekdays(days) => write!(f, "{}", format_weekday_list(days)),
        }
    }
}

/// Parsed due attribute. Immutable: advancing a recurrence builds a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueSpec {
    date: NaiveDate,
    time: Option<NaiveTime>,
    recurrence: Option<RecurrencePattern>,
    /// False for bare recurrences whose date was derived from "now".
    anchored: bool,
}

impl DueSpec {
    pub fn plain(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self {
            date,
            time,
            recurrence: None,
            anchored: true,
        }
    }

    pub fn recurring(date: NaiveDate, time: Option<NaiveTime>, pattern: RecurrencePattern) -> Self {
        Self {
            date,
            time,
            recurrence: Some(pattern),
            anchored: true,
        }
    }

    pub fn parse(value: &str, now: NaiveDateTime) -> Result<Self, DueParseError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DueParseError::Empty);
        }

        if let Some(offset) = value.strip_prefix('+') {
            let date = apply_offset(now.date(), offset)
                .ok_or_else(|| DueParseError::BadOffset(value.to_string()))?;
            return Ok(Self::plain(date, None));
        }

        if let Some((anchor, rule)) = value.split_once('|') {
            let (date, time) = parse_anchor(anchor)?;
            let pattern = RecurrencePattern::parse(rule)?;
            return Ok(Self::recurring(date, time, pattern));
        }

        if value.starts_with(|c: char| c.is_ascii_digit()) {
            let (date, time) = parse_anchor(value)?;
            return Ok(Self::plain(date, time));
        }

        let pattern = RecurrencePattern::parse(value)?;
        Ok(Self {
            date: pattern.first_on_or_after(now.date()),
            time: None,
            recurrence: Some(pattern),
            anchored: false,
        })
    }

    pub fn kind(&self) -> DueKind {
        if self.recurrence.is_some() {
            DueKind::Recurring
        } else {
            DueKind::Plain
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    pub fn recurrence(&self) -> Option<&RecurrencePattern> {
        self.recurrence.as_ref()
    }

    /// Instant used when ordering due dates. Untimed dates count as end of day,
    /// so a timed entry sorts before an untimed one on the same date.
    pub fn comparison_time(&self) -> NaiveDateTime {
        let time = self
            .time
            .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
        self.date.and_time(time)
    }

    pub fn classify(&self, now: NaiveDateTime) -> DueState {
        match self.date.cmp(&now.date()) {
            Ordering::Less => DueState::Overdue,
            Ordering::Greater => DueState::NotDue,
            Ordering::Equal => match self.time {
                Some(t) if now.time() >= t => DueState::Overdue,
                _ => DueState::Due,
            },
        }
    }

    /// Signed distance in days from today: negative when overdue.
    pub fn days_until(&self, now: NaiveDateTime) -> i64 {
        (self.date - now.date()).num_days()
    }
}

impl fmt::Display for DueSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anchored {
            write!(f, "{}", self.date.format(DATE_FORMAT))?;
            if let Some(t) = self.time {
                write!(f, "T{}", t.format(TIME_FORMAT))?;
            }
            if let Some(pattern) = &self.recurrence {
                write!(f, "|{}", pattern)?;
            }
            Ok(())
        } else {
            match &self.recurrence {
                Some(pattern) => write!(f, "{}", pattern),
                None => write!(f, "{}", self.date.format(DATE_FORMAT)),
            }
        }
    }
}

/// Classifies a raw attribute value; anything unparsable is `Invalid`.
pub fn classify_value(value: &str, now: NaiveDateTime) -> DueState {
    match DueSpec::parse(value, now) {
        Ok(spec) => spec.classify(now),
        Err(_) => DueState::Invalid,
    }
}

// --- HELPERS ---

fn parse_anchor(input: &str) -> Result<(NaiveDate, Option<NaiveTime>), DueParseError> {
    let input = input.trim();
    let (date_str, time_str) = match input.split_once(['T', 't']) {
        Some((d, t)) => (d, Some(t)),
        None => (input, None),
    };
    let date = parse_date(date_str)?;
    let time = match time_str {
        Some(t) => Some(
            NaiveTime::parse_from_str(t, TIME_FORMAT)
                .map_err(|_| DueParseError::BadTime(t.to_string()))?,
        ),
        None => None,
    };
    Ok((date, time))
}

/// Strict `YYYY-MM-DD`.
pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, DueParseError> {
    let well_formed = input.len() == 10
        && input
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(DueParseError::BadDate(input.to_string()));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| DueParseError::BadDate(input.to_string()))
}

/// `YYYY-MM-DD` or `YYYY-MM-DDTHH:mm`, as used by `cr`/`cm`/`t`.
pub(crate) fn parse_timestamp(input: &str) -> Result<NaiveDateTime, DueParseError> {
    let (date, time) = parse_anchor(input)?;
    Ok(date.and_time(time.unwrap_or(NaiveTime::MIN)))
}

pub(crate) fn format_timestamp(stamp: NaiveDateTime, include_time: bool) -> String {
    if include_time {
        stamp.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        stamp.format(DATE_FORMAT).to_string()
    }
}

/// `<N><d|w|m|y>` added to `today`.
pub(crate) fn apply_offset(today: NaiveDate, offset: &str) -> Option<NaiveDate> {
    let lower = offset.trim().to_ascii_lowercase();
    let unit_idx = lower.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = lower.split_at(unit_idx);
    let n: u32 = amount.parse().ok()?;
    match unit {
        "d" => today.checked_add_days(Days::new(u64::from(n))),
        "w" => today.checked_add_days(Days::new(u64::from(n) * 7)),
        "m" => today.checked_add_months(Months::new(n)),
        "y" => today.checked_add_months(Months::new(n.checked_mul(12)?)),
        _ => None,
    }
}

pub(crate) fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "mo" | "mon" | "monday" => Some(Weekday::Mon),
        "tu" | "tue" | "tuesday" => Some(Weekday::Tue),
        "we" | "wed" | "wednesday" => Some(Weekday::Wed),
        "th" | "thu" | "thursday" => Some(Weekday::Thu),
        "fr" | "fri" | "friday" => Some(Weekday::Fri),
        "sa" | "sat" | "saturday" => Some(Weekday::Sat),
        "su" | "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Comma separated, normalised to Monday-first order without duplicates.
fn parse_weekday_list(s: &str) -> Option<Vec<Weekday>> {
    let mut days = s
        .split(',')
        .map(parse_weekday)
        .collect::<Option<Vec<_>>>()?;
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    (!days.is_empty()).then_some(days)
}

fn format_weekday_list(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| weekday_code(*d))
        .collect::<Vec<_>>()
        .join(",")
}
