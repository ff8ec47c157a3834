//! Natural-language descriptions of recurrence rules.
//!
//! [`describe`] turns the `RRULE` of a series into a due string a task
//! manager can parse, such as `every week on Monday at 09:00 until
//! 2024-01-29`. The prose is produced from the rule parts first, then two
//! clauses are rewritten:
//!
//! - `until <stamp>` is rendered as a local date, preceded by the start time
//!   for timed series.
//! - `for N times` is replaced with `until <date of the last occurrence>`.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;
use tracing::trace;

use crate::recurrence::Recurrence;
use crate::time::EventTime;

static UNTIL_CLAUSE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"until (\d{8}T\d{6}Z|\d{8})").expect("Invalid until clause regex")
});

static COUNT_CLAUSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"for (\d+) times").expect("Invalid count clause regex"));

/// Describes a recurrence in English.
///
/// Returns `None` when the recurrence has no `RRULE` line or the rule uses
/// parts that cannot be described.
pub fn describe(recurrence: &Recurrence) -> Option<String> {
    let line = recurrence.rrule_line()?;
    let mut formatted = prose(line)?;
    let start = recurrence.start();
    let mut start_time = start
        .as_datetime()
        .map(|dt| format!("at {} ", dt.format("%H:%M")));

    let until_clause = UNTIL_CLAUSE_REGEX.captures(&formatted).and_then(|caps| {
        let range = caps.get(0)?.range();
        Some((range, until_date(&caps[1], start)?))
    });
    if let Some((range, until)) = until_clause {
        let clause = format!(
            "{}until {}",
            start_time.take().unwrap_or_default(),
            until.format("%Y-%m-%d")
        );
        formatted.replace_range(range, &clause);
    }

    if let Some(range) = COUNT_CLAUSE_REGEX.find(&formatted).map(|m| m.range()) {
        if let Some(last) = recurrence.last_occurrence() {
            let clause = format!(
                "{}until {}",
                start_time.take().unwrap_or_default(),
                last.date().format("%Y-%m-%d")
            );
            formatted.replace_range(range, &clause);
        }
    }

    if let Some(start_time) = start_time {
        formatted.push(' ');
        formatted.push_str(start_time.trim_end());
    }

    trace!(rule = line, description = %formatted, "described recurrence");
    Some(formatted)
}

/// Renders a single `RRULE` line as prose, leaving its bounds as written:
/// `for N times` and `until <UNTIL value>`.
pub fn prose(rule_line: &str) -> Option<String> {
    RuleParts::parse(rule_line).map(|parts| parts.to_prose())
}

/// Local date of an `UNTIL` value, in the series' zone when it is timed.
fn until_date(value: &str, start: &EventTime) -> Option<NaiveDate> {
    match value.strip_suffix('Z') {
        Some(stamp) => {
            let utc = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S")
                .ok()?
                .and_utc();
            Some(match start {
                EventTime::DateTime(dt) => utc.with_timezone(&dt.timezone()).date_naive(),
                EventTime::AllDay(_) => utc.date_naive(),
            })
        }
        None => NaiveDate::parse_from_str(value, "%Y%m%d").ok(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "YEARLY" => Some(Self::Yearly),
            "MONTHLY" => Some(Self::Monthly),
            "WEEKLY" => Some(Self::Weekly),
            "DAILY" => Some(Self::Daily),
            "HOURLY" => Some(Self::Hourly),
            "MINUTELY" => Some(Self::Minutely),
            "SECONDLY" => Some(Self::Secondly),
            _ => None,
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Self::Yearly => "year",
            Self::Monthly => "month",
            Self::Weekly => "week",
            Self::Daily => "day",
            Self::Hourly => "hour",
            Self::Minutely => "minute",
            Self::Secondly => "second",
        }
    }
}

/// A `BYDAY` entry such as `MO`, `2TU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DaySpec {
    ordinal: Option<i32>,
    weekday: Weekday,
}

impl DaySpec {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let split = value.len().checked_sub(2)?;
        let (ordinal, day) = value.split_at_checked(split)?;
        let weekday = match day.to_ascii_uppercase().as_str() {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            "SU" => Weekday::Sun,
            _ => return None,
        };
        let ordinal = match ordinal {
            "" => None,
            n => Some(n.parse().ok()?),
        };
        Some(Self { ordinal, weekday })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleParts {
    freq: Frequency,
    interval: u32,
    count: Option<u32>,
    until: Option<String>,
    by_day: Vec<DaySpec>,
    by_month_day: Vec<i32>,
    by_month: Vec<u32>,
    by_set_pos: Vec<i32>,
}

impl RuleParts {
    fn parse(line: &str) -> Option<Self> {
        let body = line.strip_prefix("RRULE:").unwrap_or(line);

        let mut freq = None;
        let mut parts = Self {
            freq: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
        };

        for pair in body.split(';').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=')?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(Frequency::parse(value)?),
                "INTERVAL" => parts.interval = value.parse().ok()?,
                "COUNT" => parts.count = Some(value.parse().ok()?),
                "UNTIL" => parts.until = Some(value.to_string()),
                "BYDAY" => {
                    parts.by_day = value
                        .split(',')
                        .map(DaySpec::parse)
                        .collect::<Option<Vec<_>>>()?;
                }
                "BYMONTHDAY" => parts.by_month_day = parse_list(value)?,
                "BYMONTH" => parts.by_month = parse_list(value)?,
                "BYSETPOS" => parts.by_set_pos = parse_list(value)?,
                _ => {}
            }
        }

        parts.freq = freq?;
        Some(parts)
    }

    fn to_prose(&self) -> String {
        let mut out = self.period();
        if let Some(qualifier) = self.qualifier() {
            out.push(' ');
            out.push_str(&qualifier);
        }
        if let Some(count) = self.count {
            out.push_str(&format!(" for {count} times"));
        }
        if let Some(ref until) = self.until {
            out.push_str(&format!(" until {until}"));
        }
        out
    }

    fn period(&self) -> String {
        let unit = self.freq.unit();
        match self.freq {
            Frequency::Daily | Frequency::Weekly if self.interval == 1 && self.is_weekdays() => {
                "every weekday".to_string()
            }
            _ if self.interval <= 1 => format!("every {unit}"),
            _ => format!("every {} {unit}s", self.interval),
        }
    }

    fn qualifier(&self) -> Option<String> {
        match self.freq {
            Frequency::Daily | Frequency::Weekly => {
                if self.by_day.is_empty() || (self.interval == 1 && self.is_weekdays()) {
                    return None;
                }
                let days: Vec<String> = self
                    .by_day
                    .iter()
                    .map(|spec| weekday_name(spec.weekday).to_string())
                    .collect();
                Some(format!("on {}", join(&days)))
            }
            Frequency::Monthly => self.day_of_month_phrase(),
            Frequency::Yearly => {
                let mut phrases = Vec::new();
                if !self.by_month.is_empty() {
                    let months: Vec<String> = self
                        .by_month
                        .iter()
                        .filter_map(|month| month_name(*month))
                        .map(str::to_string)
                        .collect();
                    phrases.push(format!("in {}", join(&months)));
                }
                phrases.extend(self.day_of_month_phrase());
                (!phrases.is_empty()).then(|| phrases.join(" "))
            }
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => None,
        }
    }

    fn day_of_month_phrase(&self) -> Option<String> {
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self
                .by_month_day
                .iter()
                .map(|&day| {
                    if day < 0 {
                        format!("{} day", ordinal_word(day))
                    } else {
                        ordinal_word(day)
                    }
                })
                .collect();
            return Some(format!("on the {}", join(&days)));
        }

        if self.by_day.is_empty() {
            return None;
        }

        let set_pos = match self.by_set_pos.as_slice() {
            [pos] => Some(*pos),
            _ => None,
        };

        if let (Some(pos), true) = (set_pos, self.is_weekdays()) {
            return Some(format!("on the {} weekday", ordinal_word(pos)));
        }

        let days: Vec<String> = self
            .by_day
            .iter()
            .map(|spec| match spec.ordinal.or(set_pos) {
                Some(n) => format!("the {} {}", ordinal_word(n), weekday_name(spec.weekday)),
                None => weekday_name(spec.weekday).to_string(),
            })
            .collect();
        Some(format!("on {}", join(&days)))
    }

    /// Monday to Friday, without ordinals.
    fn is_weekdays(&self) -> bool {
        const WEEKDAYS: [Weekday; 5] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        self.by_day.len() == WEEKDAYS.len()
            && self.by_day.iter().all(|spec| spec.ordinal.is_none())
            && WEEKDAYS
                .iter()
                .all(|day| self.by_day.iter().any(|spec| spec.weekday == *day))
    }
}

fn parse_list<T: FromStr>(value: &str) -> Option<Vec<T>> {
    value
        .split(',')
        .map(|item| item.trim().parse().ok())
        .collect()
}

/// Joins items as `a`, `a and b`, or `a, b and c`.
fn join(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn ordinal_word(n: i32) -> String {
    match n {
        -1 => "last".to_string(),
        n if n < 0 => format!("{} to last", ordinal_word(-n)),
        n => {
            let suffix = match (n % 10, n % 100) {
                (_, 11..=13) => "th",
                (1, _) => "st",
                (2, _) => "nd",
                (3, _) => "rd",
                _ => "th",
            };
            format!("{n}{suffix}")
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn month_name(month: u32) -> Option<&'static str> {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS.get(month.checked_sub(1)? as usize).copied()
}
