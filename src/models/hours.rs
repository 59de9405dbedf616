use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One opening window on a weekday, e.g. `{"day":"mon","start":"09:00","end":"17:00"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursWindow {
    pub day: String,
    pub start: String,
    pub end: String,
}

impl HoursWindow {
    pub fn validate(&self) -> anyhow::Result<()> {
        parse_weekday(&self.day)?;
        let start = parse_time(&self.start)?;
        let end = parse_time(&self.end)?;
        if end <= start {
            return Err(anyhow::anyhow!(
                "window ends before it starts: {}-{}",
                self.start,
                self.end
            ));
        }
        Ok(())
    }
}

/// Opening windows that apply on `weekday`, sorted by start. Malformed
/// windows are skipped.
pub fn windows_for(hours: &[HoursWindow], weekday: Weekday) -> Vec<(NaiveTime, NaiveTime)> {
    let mut windows: Vec<(NaiveTime, NaiveTime)> = hours
        .iter()
        .filter(|w| parse_weekday(&w.day).map(|d| d == weekday).unwrap_or(false))
        .filter_map(|w| Some((parse_time(&w.start).ok()?, parse_time(&w.end).ok()?)))
        .filter(|(start, end)| start < end)
        .collect();
    windows.sort();
    windows
}

pub fn to_human_readable(hours: &[HoursWindow]) -> String {
    if hours.is_empty() {
        return String::new();
    }

    let day_order = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

    let mut sorted = hours.to_vec();
    sorted.sort_by_key(|w| {
        let idx = day_order
            .iter()
            .position(|d| *d == w.day.to_lowercase())
            .unwrap_or(7);
        (idx, w.start.clone())
    });

    sorted
        .iter()
        .map(|w| format!("{}: {}-{}", capitalize(&w.day), w.start, w.end))
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

pub fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
    let hour: u32 = hour
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}
