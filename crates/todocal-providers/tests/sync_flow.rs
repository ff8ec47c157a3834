//! End to end: pull a calendar, pick next occurrences, write tasks, and link
//! them back onto the events.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use todocal_core::{
    CalendarSettings, EventTime, RawAttendee, RawEvent, RawEventTime, ResponseStatus,
};
use todocal_providers::{Calendar, InMemoryCalendarSource, InMemoryTaskSink, TaskItem};

const TASK_ID_KEY: &str = "todoist_id";

fn paris(date_time: &str) -> RawEventTime {
    RawEventTime::from_date_time(date_time, Some("Europe/Paris"))
}

fn conference_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()
}

fn me(status: ResponseStatus) -> RawAttendee {
    RawAttendee::new("me@example.com")
        .as_self()
        .with_response(status)
}

fn calendar_events() -> Vec<RawEvent> {
    vec![
        RawEvent::new("series_20240108", paris("2024-01-09T10:00:00+01:00"))
            .with_original_start("series", paris("2024-01-08T09:00:00+01:00"))
            .with_summary("Team sync (moved)"),
        RawEvent::new("series", paris("2024-01-01T09:00:00+01:00"))
            .with_end(paris("2024-01-01T09:30:00+01:00"))
            .with_summary("Team sync")
            .with_recurrence(["RRULE:FREQ=WEEKLY;COUNT=5;BYDAY=MO"])
            .with_attendee(me(ResponseStatus::Accepted)),
        RawEvent::new("conference", RawEventTime::from_date(conference_day()))
            .with_summary("Conference"),
        RawEvent::new("skipped", paris("2024-01-05T14:00:00+01:00"))
            .with_summary("Vendor pitch")
            .with_attendee(me(ResponseStatus::Declined)),
    ]
}

fn settings() -> CalendarSettings {
    CalendarSettings {
        default_timezone: "Europe/Paris".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn calendar_to_tasks() {
    let source = InMemoryCalendarSource::new(calendar_events()).with_page_size(2);
    let sink = InMemoryTaskSink::new();
    let mut calendar = Calendar::new(settings()).unwrap();

    let stats = calendar.sync(&source).await.unwrap();
    assert_eq!(stats.events, 3);
    assert_eq!(stats.exceptions, 1);
    assert_eq!(stats.orphans, 0);

    let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

    // The rescheduled instance wins over the next regular Monday.
    let series = calendar.event("series").unwrap();
    let next = series.next_occurrence(now).unwrap().unwrap();
    assert_eq!(next.event.id(), "series_20240108");
    assert_eq!(next.event.summary(), Some("Team sync (moved)"));
    assert_eq!(next.start.to_string(), "2024-01-09T10:00:00+01:00");

    let due = series.recurrence_string().unwrap().unwrap();
    assert_eq!(due, "every week on Monday at 09:00 until 2024-01-29");

    let mut task = TaskItem::new(series.summary().unwrap(), "proj");
    task.set_due_by_string(&due);
    task.save(&sink).await.unwrap();
    let task_id = task.id().unwrap().to_string();

    calendar
        .event_mut("series")
        .unwrap()
        .save_private_info(TASK_ID_KEY, &task_id);
    assert!(calendar.save_event(&source, "series").await.unwrap());

    let updates = source.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "series");
    assert!(updates[0].1.summary.is_none());

    // All-day events become date-only tasks.
    let conference = calendar.event("conference").unwrap();
    let next = conference.next_occurrence(now).unwrap().unwrap();
    assert_eq!(next.start, EventTime::AllDay(conference_day()));
    let mut task = TaskItem::new(conference.summary().unwrap(), "proj");
    task.set_next_occurrence(next.start.date().and_time(NaiveTime::MIN), false);
    task.save(&sink).await.unwrap();

    // Declined events produce nothing.
    let skipped = calendar.event("skipped").unwrap();
    assert!(skipped.next_occurrence(now).unwrap().is_none());

    let tasks = sink.tasks().await;
    assert_eq!(tasks.len(), 2);
    assert_eq!(
        tasks[1].due.as_ref().and_then(|due| due.date.as_deref()),
        Some("2024-01-20")
    );
}

#[tokio::test]
async fn resync_keeps_saved_links() {
    let source = InMemoryCalendarSource::new(calendar_events());
    let mut calendar = Calendar::new(settings()).unwrap();
    calendar.sync(&source).await.unwrap();

    calendar
        .event_mut("series_20240108")
        .unwrap()
        .save_private_info(TASK_ID_KEY, "task-9");
    assert!(calendar.save_event(&source, "series_20240108").await.unwrap());

    let mut renamed = source.event("series").await.unwrap();
    renamed.summary = Some("Team sync (new room)".to_string());
    source.put(renamed).await;

    calendar.sync(&source).await.unwrap();
    let series = calendar.event("series").unwrap();
    assert_eq!(series.summary(), Some("Team sync (new room)"));
    assert_eq!(
        series
            .exception("series_20240108")
            .unwrap()
            .get_private_info(TASK_ID_KEY),
        Some("task-9")
    );
    assert!(series.pending_changes().is_none());
}
