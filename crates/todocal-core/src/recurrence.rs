//! Recurrence rule normalization and expansion.
//!
//! A master event carries its schedule as rule-grammar lines (`RRULE:`,
//! `EXDATE:`, `RDATE:`). [`Recurrence`] anchors those lines at the event's
//! start and expands them lazily with the `rrule` crate.
//!
//! All-day series need one textual fix before parsing: the source writes
//! their `UNTIL` as a UTC instant, which is reinterpreted as a calendar date
//! in the calendar's default zone (see [`normalize_lines`]).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use rrule::{Frequency, RRuleError, RRuleSet};
use tracing::{debug, trace};

use crate::error::RecurrenceParseError;
use crate::time::{EventTime, local_midnight};

/// Compact UTC stamp used by the rule grammar.
const UTC_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `UNTIL` given as a compact UTC instant.
static UNTIL_UTC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UNTIL=(\d{8}T\d{6}Z)").expect("Invalid UNTIL regex"));

/// `UNTIL` given as a bare date.
static UNTIL_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UNTIL=(\d{8})(;|$)").expect("Invalid UNTIL date regex"));

/// `EXDATE`/`RDATE` with date values.
static DATE_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(EXDATE|RDATE);VALUE=DATE:([\d,]+)$").expect("Invalid date list regex")
});

/// Rewrites the lines of an all-day series so that a UTC `UNTIL` becomes a
/// bare calendar date in `default_tz`.
///
/// `UNTIL=20240615T000000Z` in `America/New_York` becomes `UNTIL=20240614`.
/// Timed series and lines without `RRULE`/`UNTIL` are returned unchanged.
pub fn normalize_lines(lines: &[String], start: &EventTime, default_tz: Tz) -> Vec<String> {
    if !start.is_all_day() {
        return lines.to_vec();
    }

    lines
        .iter()
        .map(|line| {
            if !line.contains("RRULE") || !line.contains("UNTIL") {
                return line.clone();
            }
            UNTIL_UTC_REGEX
                .replace(line, |caps: &Captures<'_>| {
                    match NaiveDateTime::parse_from_str(&caps[1], UTC_STAMP_FORMAT) {
                        Ok(until) => {
                            let local = until.and_utc().with_timezone(&default_tz).date_naive();
                            debug!(until = &caps[1], %local, "reinterpreting all-day UNTIL");
                            format!("UNTIL={}", local.format("%Y%m%d"))
                        }
                        // Left for the grammar parser to reject.
                        Err(_) => caps[0].to_string(),
                    }
                })
                .into_owned()
        })
        .collect()
}

/// A recurrence rule anchored at a series start.
#[derive(Debug, Clone)]
pub struct Recurrence {
    lines: Vec<String>,
    start: EventTime,
    /// `None` when every rule ends before the series starts.
    set: Option<RRuleSet>,
}

impl Recurrence {
    /// Normalizes and parses the recurrence lines of a master event.
    ///
    /// A rule whose `UNTIL` falls before the start is well-formed and simply
    /// produces nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceParseError`] if the rule grammar parser rejects
    /// the lines.
    pub fn parse(
        event_id: &str,
        lines: &[String],
        start: &EventTime,
        default_tz: Tz,
    ) -> Result<Self, RecurrenceParseError> {
        let lines = normalize_lines(lines, start, default_tz);
        Self::anchored(lines, start.clone())
            .map_err(|(text, e)| RecurrenceParseError::new(event_id, &text, e.to_string()))
    }

    fn anchored(lines: Vec<String>, start: EventTime) -> Result<Self, (String, RRuleError)> {
        let mut text = dtstart_line(&start);
        let mut generating = false;
        let mut ended_early = false;

        for line in &lines {
            let line = engine_line(line, &start);
            if let Some(until) = until_before_start(&line, &start) {
                // Still has to be valid on its own.
                let alone = format!("DTSTART:{until}\n{line}");
                alone.parse::<RRuleSet>().map_err(|e| (alone.clone(), e))?;
                debug!(rule = %line, "rule ends before the series starts");
                ended_early = true;
                continue;
            }
            generating |= line.starts_with("RRULE:") || line.starts_with("RDATE");
            text.push('\n');
            text.push_str(&line);
        }
        trace!(rule = %text, "parsing recurrence");

        let set = if generating || !ended_early {
            Some(text.parse::<RRuleSet>().map_err(|e| (text.clone(), e))?)
        } else {
            None
        };

        Ok(Self { lines, start, set })
    }

    /// The normalized rule lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The first `RRULE:` line, if any.
    pub fn rrule_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .find(|line| line.starts_with("RRULE:"))
    }

    /// The series start the rule is anchored at.
    pub fn start(&self) -> &EventTime {
        &self.start
    }

    /// Returns true when every rule is bounded by `COUNT` or `UNTIL`.
    pub fn is_finite(&self) -> bool {
        self.lines
            .iter()
            .filter(|line| line.starts_with("RRULE:"))
            .all(|line| line.contains("COUNT=") || line.contains("UNTIL="))
    }

    /// All occurrences in increasing order, shaped like the series start.
    ///
    /// The iterator is lazy and unbounded for infinite series.
    pub fn occurrences(&self) -> impl Iterator<Item = EventTime> + '_ {
        self.set
            .iter()
            .flatten()
            .map(|occurrence| self.shape(&occurrence))
    }

    /// Occurrences strictly after `after`, in increasing order.
    pub fn occurrences_after<'a>(
        &'a self,
        after: &'a EventTime,
    ) -> impl Iterator<Item = EventTime> + 'a {
        self.occurrences()
            .skip_while(move |occurrence| occurrence <= after)
    }

    /// Re-anchors the series close to `after` so that
    /// [`Recurrence::occurrences_after`] does not walk every slot since the
    /// original start.
    ///
    /// Only a single uncounted `RRULE` stepping by days or less, without
    /// `BYSETPOS`, can be moved: its slots repeat every `INTERVAL` periods of
    /// wall-clock time. Returns `None` when the series cannot be moved or is
    /// already close.
    pub fn fast_forward(&self, after: &EventTime) -> Option<Recurrence> {
        let [rule] = self.set.as_ref()?.get_rrule().as_slice() else {
            return None;
        };
        if rule.get_count().is_some() || !rule.get_by_set_pos().is_empty() {
            return None;
        }
        let unit = match rule.get_freq() {
            Frequency::Daily => TimeDelta::days(1),
            Frequency::Hourly => TimeDelta::hours(1),
            Frequency::Minutely => TimeDelta::minutes(1),
            Frequency::Secondly => TimeDelta::seconds(1),
            _ => return None,
        };
        let step = unit.num_seconds() * i64::from(rule.get_interval().max(1));

        let from = wall_clock(&self.start);
        // Two days of slack keep the new start before `after` across DST folds.
        let target = wall_clock(&after.shaped_like(&self.start)) - TimeDelta::days(2);
        let periods = (target - from).num_seconds() / step;
        if periods < 1 {
            return None;
        }
        let moved = from + TimeDelta::try_seconds(periods.checked_mul(step)?)?;

        let start = match self.start {
            EventTime::AllDay(_) => EventTime::AllDay(moved.date()),
            EventTime::DateTime(ref dt) => {
                EventTime::DateTime(dt.timezone().from_local_datetime(&moved).single()?)
            }
        };
        trace!(from = %self.start, to = %start, "fast-forwarding recurrence");
        Self::anchored(self.lines.clone(), start).ok()
    }

    /// The final occurrence of a finite series.
    ///
    /// Returns `None` for series without a `COUNT`/`UNTIL` bound and for
    /// bounded series that produce no occurrences.
    pub fn last_occurrence(&self) -> Option<EventTime> {
        if !self.is_finite() {
            return None;
        }
        self.occurrences().last()
    }

    fn shape(&self, occurrence: &DateTime<rrule::Tz>) -> EventTime {
        match &self.start {
            EventTime::AllDay(_) => EventTime::AllDay(occurrence.date_naive()),
            EventTime::DateTime(start) => {
                EventTime::DateTime(occurrence.with_timezone(&start.timezone()))
            }
        }
    }
}

fn dtstart_line(start: &EventTime) -> String {
    match start {
        EventTime::AllDay(date) => format!("DTSTART:{}T000000Z", date.format("%Y%m%d")),
        EventTime::DateTime(dt) => format!(
            "DTSTART;TZID={}:{}",
            dt.timezone().name(),
            dt.format("%Y%m%dT%H%M%S")
        ),
    }
}

/// Rewrites a line into the form the rule parser accepts for this start.
///
/// A date-valued `UNTIL` becomes a UTC stamp: midnight UTC for all-day
/// series (anchored at midnight UTC), local midnight in the start zone for
/// timed ones. All-day `EXDATE`/`RDATE` dates get the same midnight UTC.
fn engine_line(line: &str, start: &EventTime) -> String {
    if line.starts_with("RRULE:") {
        return UNTIL_DATE_REGEX
            .replace(line, |caps: &Captures<'_>| {
                match NaiveDate::parse_from_str(&caps[1], "%Y%m%d") {
                    Ok(date) => format!("UNTIL={}{}", midnight_stamp(date, start), &caps[2]),
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned();
    }

    if start.is_all_day() {
        if let Some(caps) = DATE_LIST_REGEX.captures(line) {
            let dates: Vec<String> = caps[2]
                .split(',')
                .filter(|date| !date.is_empty())
                .map(|date| format!("{date}T000000Z"))
                .collect();
            return format!("{}:{}", &caps[1], dates.join(","));
        }
    }

    line.to_string()
}

fn midnight_stamp(date: NaiveDate, start: &EventTime) -> String {
    let utc = match start {
        EventTime::AllDay(_) => date.and_time(NaiveTime::MIN).and_utc(),
        EventTime::DateTime(dt) => local_midnight(date, dt.timezone()).with_timezone(&Utc),
    };
    utc.format(UTC_STAMP_FORMAT).to_string()
}

/// The `UNTIL` stamp of an `RRULE` line bounded before the series start.
fn until_before_start<'a>(line: &'a str, start: &EventTime) -> Option<&'a str> {
    if !line.starts_with("RRULE:") {
        return None;
    }
    let stamp = UNTIL_UTC_REGEX.captures(line)?.get(1)?.as_str();
    let until = NaiveDateTime::parse_from_str(stamp, UTC_STAMP_FORMAT)
        .ok()?
        .and_utc();
    let start = match start {
        EventTime::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        EventTime::DateTime(dt) => dt.with_timezone(&Utc),
    };
    (until < start).then_some(stamp)
}

/// Wall-clock time of a series value; dates count from midnight.
fn wall_clock(time: &EventTime) -> NaiveDateTime {
    match time {
        EventTime::AllDay(date) => date.and_time(NaiveTime::MIN),
        EventTime::DateTime(dt) => dt.naive_local(),
    }
}
