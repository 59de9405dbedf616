use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::hours::{self, HoursWindow};
use crate::models::{BusinessConfig, CalendarEvent, EventTime};

pub const DEFAULT_GRANULARITY_MINUTES: u32 = 30;
pub const SUMMARY_DAYS: i64 = 7;
pub const BUSINESS_DAY_SLOTS: u32 = 8;

#[derive(Debug)]
pub enum SchedulingError {
    OutsideBusinessHours { hours: String },
    Conflict,
    NotOffered,
}

impl std::fmt::Display for SchedulingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulingError::OutsideBusinessHours { hours } => {
                write!(
                    f,
                    "That time is outside our business hours. We're available: {hours}"
                )
            }
            SchedulingError::Conflict => {
                write!(
                    f,
                    "Sorry, that time slot is already booked. Could you pick a different time?"
                )
            }
            SchedulingError::NotOffered => {
                write!(
                    f,
                    "Appointments can't start at that time. Please pick one of the available start times."
                )
            }
        }
    }
}

/// Half-open `[start, end)` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The operating windows that apply to one location.
#[derive(Debug, Clone)]
pub struct OpeningHours {
    pub timezone: Tz,
    pub hours: Vec<HoursWindow>,
}

impl OpeningHours {
    /// Hours for the named (or first) location. Without any configured hours the
    /// business day is assumed to run 09:00-17:00 every day.
    pub fn for_location(config: &BusinessConfig, location: Option<&str>) -> Option<Self> {
        let (timezone, hours) = match config.location(location) {
            Some(loc) => (loc.timezone.parse().unwrap_or(config.timezone()), loc.hours.clone()),
            None if location.is_some() => return None,
            None => (config.timezone(), Vec::new()),
        };
        let hours = if hours.is_empty() { default_hours() } else { hours };
        Some(Self { timezone, hours })
    }

    pub fn windows_on(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        hours::windows_for(&self.hours, date.weekday())
    }

    pub fn describe(&self) -> String {
        hours::to_human_readable(&self.hours)
    }
}

fn default_hours() -> Vec<HoursWindow> {
    ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
        .iter()
        .map(|day| HoursWindow {
            day: day.to_string(),
            start: "09:00".to_string(),
            end: "17:00".to_string(),
        })
        .collect()
}

/// Free time on one day: maximal free intervals long enough for the requested
/// duration, and the bookable start times inside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayAvailability {
    pub free: Vec<Interval>,
    pub slots: Vec<DateTime<Utc>>,
}

/// Resolve open slots on `date`.
///
/// Busy events are clipped to the operating windows, sorted and merged
/// (overlapping or touching) before they are subtracted. Slot starts fall on
/// `granularity_minutes` boundaries counted from local midnight.
pub fn resolve_slots(
    date: NaiveDate,
    opening: &OpeningHours,
    events: &[CalendarEvent],
    duration_minutes: u32,
    granularity_minutes: u32,
) -> DayAvailability {
    if duration_minutes == 0 || granularity_minutes == 0 {
        return DayAvailability::default();
    }
    if events.iter().any(|e| e.is_all_day() && e.covers_date(date)) {
        return DayAvailability::default();
    }

    let tz = opening.timezone;
    let windows: Vec<Interval> = opening
        .windows_on(date)
        .into_iter()
        .filter_map(|(open, close)| {
            Some(Interval {
                start: local_to_utc(tz, date.and_time(open))?,
                end: local_to_utc(tz, date.and_time(close))?,
            })
        })
        .filter(|w| w.start < w.end)
        .collect();

    let (Some(day_start), Some(day_end)) = (
        windows.iter().map(|w| w.start).min(),
        windows.iter().map(|w| w.end).max(),
    ) else {
        return DayAvailability::default();
    };

    let busy = merge_intervals(
        events
            .iter()
            .filter_map(CalendarEvent::span)
            .map(|(start, end)| Interval {
                start: start.max(day_start),
                end: end.min(day_end),
            })
            .filter(|i| i.start < i.end)
            .collect(),
    );

    let duration = Duration::minutes(duration_minutes as i64);
    let free: Vec<Interval> = merge_intervals(windows)
        .into_iter()
        .flat_map(|w| subtract(w, &busy))
        .filter(|i| i.end - i.start >= duration)
        .collect();

    let Some(midnight) = local_to_utc(tz, date.and_time(NaiveTime::MIN)) else {
        return DayAvailability { free, slots: Vec::new() };
    };
    let step = Duration::minutes(granularity_minutes as i64);
    let mut slots = Vec::new();
    for interval in &free {
        let mut cursor = align_up(interval.start, midnight, step);
        while cursor + duration <= interval.end {
            slots.push(cursor);
            cursor += step;
        }
    }

    DayAvailability { free, slots }
}

/// Sort and coalesce overlapping or adjacent intervals.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// `window` minus a sorted, merged list of busy intervals.
fn subtract(window: Interval, busy: &[Interval]) -> Vec<Interval> {
    let mut free = Vec::new();
    let mut cursor = window.start;
    for b in busy {
        if b.end <= cursor || b.start >= window.end {
            continue;
        }
        if b.start > cursor {
            free.push(Interval {
                start: cursor,
                end: b.start,
            });
        }
        cursor = cursor.max(b.end);
    }
    if cursor < window.end {
        free.push(Interval {
            start: cursor,
            end: window.end,
        });
    }
    free
}

fn align_up(t: DateTime<Utc>, origin: DateTime<Utc>, step: Duration) -> DateTime<Utc> {
    let offset = (t - origin).num_seconds();
    let step_secs = step.num_seconds();
    let steps = offset.div_euclid(step_secs) + i64::from(offset.rem_euclid(step_secs) != 0);
    origin + Duration::seconds(steps * step_secs)
}

/// Interpret a local wall-clock time in `tz`. Times inside a DST gap move
/// forward by an hour.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// UTC bounds of the local calendar day `date` in `tz`.
pub fn day_bounds(tz: Tz, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date.succ_opt()?;
    Some((
        local_to_utc(tz, date.and_time(NaiveTime::MIN))?,
        local_to_utc(tz, next.and_time(NaiveTime::MIN))?,
    ))
}

/// Check a requested start against the resolved availability for its day.
/// Only starts the resolver offered are accepted.
pub fn validate_booking_time(
    start: DateTime<Utc>,
    duration_minutes: u32,
    opening: &OpeningHours,
    availability: &DayAvailability,
) -> Result<(), SchedulingError> {
    if availability.slots.contains(&start) {
        return Ok(());
    }

    let end = start + Duration::minutes(duration_minutes as i64);
    if availability.free.iter().any(|f| f.start <= start && end <= f.end) {
        return Err(SchedulingError::NotOffered);
    }

    let date = start.with_timezone(&opening.timezone).date_naive();
    let within_hours = opening.windows_on(date).into_iter().any(|(open, close)| {
        match (
            local_to_utc(opening.timezone, date.and_time(open)),
            local_to_utc(opening.timezone, date.and_time(close)),
        ) {
            (Some(o), Some(c)) => o <= start && end <= c,
            _ => false,
        }
    });

    if within_hours {
        Err(SchedulingError::Conflict)
    } else {
        Err(SchedulingError::OutsideBusinessHours {
            hours: opening.describe(),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub events: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailabilitySummary {
    pub timezone: String,
    pub days: Vec<DayCount>,
    pub available_slots_today: u32,
}

/// The UTC range covering `today` and the following six local days.
pub fn summary_range(tz: Tz, today: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, _) = day_bounds(tz, today)?;
    let (_, end) = day_bounds(tz, today + Duration::days(SUMMARY_DAYS - 1))?;
    Some((start, end))
}

/// Per-day event counts for the 7-day window starting at `today`, plus the
/// coarse "slots left today" figure assuming an 8-slot, one-hour business day.
pub fn summarize_week(tz: Tz, today: NaiveDate, events: &[CalendarEvent]) -> AvailabilitySummary {
    let mut days: Vec<DayCount> = (0..SUMMARY_DAYS)
        .map(|offset| DayCount {
            date: today + Duration::days(offset),
            events: 0,
        })
        .collect();

    for event in events {
        for day in days.iter_mut() {
            let on_day = match &event.start {
                EventTime::DateTime(start) => start.with_timezone(&tz).date_naive() == day.date,
                EventTime::Date(_) => event.covers_date(day.date),
            };
            if on_day {
                day.events += 1;
            }
        }
    }

    let today_count = days.first().map(|d| d.events).unwrap_or(0);
    AvailabilitySummary {
        timezone: tz.name().to_string(),
        days,
        available_slots_today: BUSINESS_DAY_SLOTS.saturating_sub(today_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-06-16 is a Monday.
    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn at(hm: &str) -> DateTime<Utc> {
        let t = NaiveTime::parse_from_str(hm, "%H:%M").unwrap();
        Utc.from_utc_datetime(&date().and_time(t))
    }

    fn event(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            start: EventTime::DateTime(at(start)),
            end: EventTime::DateTime(at(end)),
            summary: "Booked".to_string(),
            link: None,
        }
    }

    fn all_day() -> CalendarEvent {
        CalendarEvent {
            start: EventTime::Date(date()),
            end: EventTime::Date(date().succ_opt().unwrap()),
            summary: "Holiday".to_string(),
            link: None,
        }
    }

    fn nine_to_five() -> OpeningHours {
        OpeningHours {
            timezone: chrono_tz::UTC,
            hours: vec![HoursWindow {
                day: "mon".to_string(),
                start: "09:00".to_string(),
                end: "17:00".to_string(),
            }],
        }
    }

    fn interval(start: &str, end: &str) -> Interval {
        Interval {
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn test_empty_day_is_one_full_window() {
        let result = resolve_slots(date(), &nine_to_five(), &[], 60, 30);
        assert_eq!(result.free, vec![interval("09:00", "17:00")]);
        assert_eq!(result.slots.first(), Some(&at("09:00")));
        assert_eq!(result.slots.last(), Some(&at("16:00")));
    }

    #[test]
    fn test_fully_booked_day_is_empty() {
        let events = vec![event("08:00", "12:00"), event("12:00", "18:00")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 30, 30);
        assert!(result.free.is_empty());
        assert!(result.slots.is_empty());
    }

    #[test]
    fn test_overlapping_events_merge() {
        let merged = merge_intervals(vec![interval("09:30", "11:00"), interval("09:00", "10:00")]);
        assert_eq!(merged, vec![interval("09:00", "11:00")]);

        let events = vec![event("09:00", "10:00"), event("09:30", "11:00")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 60, 30);
        assert_eq!(result.free, vec![interval("11:00", "17:00")]);
    }

    #[test]
    fn test_adjacent_events_merge() {
        let merged = merge_intervals(vec![interval("09:00", "10:00"), interval("10:00", "11:00")]);
        assert_eq!(merged, vec![interval("09:00", "11:00")]);
    }

    #[test]
    fn test_all_day_event_blocks_day() {
        let events = vec![event("12:00", "13:00"), all_day()];
        let result = resolve_slots(date(), &nine_to_five(), &events, 30, 30);
        assert_eq!(result, DayAvailability::default());
    }

    #[test]
    fn test_all_day_event_on_other_day_is_ignored() {
        let mut other = all_day();
        other.start = EventTime::Date(date().pred_opt().unwrap());
        other.end = EventTime::Date(date());
        let result = resolve_slots(date(), &nine_to_five(), &[other], 60, 30);
        assert_eq!(result.free, vec![interval("09:00", "17:00")]);
    }

    #[test]
    fn test_short_gap_yields_no_slot() {
        // 10:00-10:45 is free but too short for an hour.
        let events = vec![event("09:00", "10:00"), event("10:45", "17:00")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 60, 30);
        assert!(result.free.is_empty());
        assert!(result.slots.is_empty());
    }

    #[test]
    fn test_duration_longer_than_window() {
        let result = resolve_slots(date(), &nine_to_five(), &[], 9 * 60, 30);
        assert!(result.slots.is_empty());
    }

    #[test]
    fn test_zero_duration_or_granularity() {
        assert!(resolve_slots(date(), &nine_to_five(), &[], 0, 30).slots.is_empty());
        assert!(resolve_slots(date(), &nine_to_five(), &[], 30, 0).slots.is_empty());
    }

    #[test]
    fn test_closed_weekday_is_empty() {
        let tuesday = date().succ_opt().unwrap();
        let result = resolve_slots(tuesday, &nine_to_five(), &[], 30, 30);
        assert_eq!(result, DayAvailability::default());
    }

    #[test]
    fn test_lunch_break_scenario() {
        let events = vec![event("12:00", "13:00")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 60, 30);

        let expected: Vec<DateTime<Utc>> = [
            "09:00", "09:30", "10:00", "10:30", "11:00", "13:00", "13:30", "14:00", "14:30",
            "15:00", "15:30", "16:00",
        ]
        .iter()
        .map(|s| at(s))
        .collect();
        assert_eq!(result.slots, expected);
        assert!(!result.slots.contains(&at("11:30")));
        assert!(result.slots.iter().all(|s| *s <= at("16:00")));
        assert_eq!(
            result.free,
            vec![interval("09:00", "12:00"), interval("13:00", "17:00")]
        );
    }

    #[test]
    fn test_slot_starts_align_to_granularity() {
        let events = vec![event("09:00", "10:10")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 30, 30);
        assert_eq!(result.free[0].start, at("10:10"));
        assert_eq!(result.slots[0], at("10:30"));
    }

    #[test]
    fn test_events_outside_hours_are_clipped() {
        let events = vec![event("07:00", "09:30"), event("16:30", "19:00")];
        let result = resolve_slots(date(), &nine_to_five(), &events, 30, 30);
        assert_eq!(result.free, vec![interval("09:30", "16:30")]);
    }

    #[test]
    fn test_split_windows() {
        let mut opening = nine_to_five();
        opening.hours = vec![
            HoursWindow {
                day: "mon".to_string(),
                start: "09:00".to_string(),
                end: "12:00".to_string(),
            },
            HoursWindow {
                day: "mon".to_string(),
                start: "13:00".to_string(),
                end: "15:00".to_string(),
            },
        ];
        let result = resolve_slots(date(), &opening, &[], 60, 60);
        assert_eq!(
            result.free,
            vec![interval("09:00", "12:00"), interval("13:00", "15:00")]
        );
        assert_eq!(
            result.slots,
            vec![at("09:00"), at("10:00"), at("11:00"), at("13:00"), at("14:00")]
        );
    }

    #[test]
    fn test_location_timezone_is_applied() {
        let mut opening = nine_to_five();
        opening.timezone = chrono_tz::America::New_York;
        // 09:00 EDT is 13:00 UTC.
        let result = resolve_slots(date(), &opening, &[], 60, 30);
        assert_eq!(result.free, vec![interval("13:00", "21:00")]);
        assert_eq!(result.slots[0], at("13:00"));
    }

    #[test]
    fn test_validate_booking_time() {
        let opening = nine_to_five();
        let events = vec![event("12:00", "13:00")];
        let availability = resolve_slots(date(), &opening, &events, 60, 30);

        assert!(validate_booking_time(at("10:00"), 60, &opening, &availability).is_ok());
        assert!(matches!(
            validate_booking_time(at("11:30"), 60, &opening, &availability),
            Err(SchedulingError::Conflict)
        ));
        assert!(matches!(
            validate_booking_time(at("16:30"), 60, &opening, &availability),
            Err(SchedulingError::OutsideBusinessHours { .. })
        ));
    }

    #[test]
    fn test_booking_off_the_slot_grid_is_rejected() {
        let opening = nine_to_five();
        let availability = resolve_slots(date(), &opening, &[], 60, 30);

        assert!(!availability.slots.contains(&at("10:10")));
        assert!(matches!(
            validate_booking_time(at("10:10"), 60, &opening, &availability),
            Err(SchedulingError::NotOffered)
        ));
        assert!(validate_booking_time(at("10:30"), 60, &opening, &availability).is_ok());
    }

    #[test]
    fn test_summarize_week() {
        let events = vec![
            event("09:00", "10:00"),
            event("11:00", "12:00"),
            CalendarEvent {
                start: EventTime::Date(date() + Duration::days(2)),
                end: EventTime::Date(date() + Duration::days(3)),
                summary: "Closed".to_string(),
                link: None,
            },
        ];
        let summary = summarize_week(chrono_tz::UTC, date(), &events);
        assert_eq!(summary.days.len(), 7);
        assert_eq!(summary.days[0].events, 2);
        assert_eq!(summary.days[1].events, 0);
        assert_eq!(summary.days[2].events, 1);
        assert_eq!(summary.available_slots_today, 6);
    }

    #[test]
    fn test_summary_never_goes_negative() {
        let events: Vec<CalendarEvent> = (0..10).map(|_| event("09:00", "10:00")).collect();
        let summary = summarize_week(chrono_tz::UTC, date(), &events);
        assert_eq!(summary.available_slots_today, 0);
    }

    #[test]
    fn test_opening_hours_default_and_unknown_location() {
        let config = BusinessConfig::default();
        let opening = OpeningHours::for_location(&config, None).unwrap();
        assert_eq!(opening.windows_on(date()).len(), 1);
        assert!(OpeningHours::for_location(&config, Some("Elm St")).is_none());
    }
}
