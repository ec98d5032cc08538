use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::domain::EvidenceRequest;

/// Which of a request's two deadline notations is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineChannel {
    /// `deadline_date`, a calendar date.
    Primary,
    /// `deadline_alt`, the day-month-two-digit-year text form.
    Compact,
}

impl DeadlineChannel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "Deadline",
            Self::Compact => "Compact deadline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    /// Fulfilled requests never raise alerts.
    Closed,
    /// No parsable deadline on this channel.
    Unscheduled,
    Overdue,
    Approaching,
    OnTrack,
}

impl Proximity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::Unscheduled => "Unscheduled",
            Self::Overdue => "Overdue",
            Self::Approaching => "Approaching",
            Self::OnTrack => "On Track",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelView {
    pub channel: DeadlineChannel,
    pub raw: String,
    pub date: Option<NaiveDate>,
    pub days_until: Option<i64>,
    pub label: String,
    pub proximity: Proximity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineView {
    pub request_id: String,
    pub description: String,
    pub status_label: &'static str,
    pub primary: ChannelView,
    pub compact: ChannelView,
}

/// Alert counts over the primary deadline channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeadlineSummary {
    pub approaching: usize,
    pub overdue: usize,
}

/// Parses `YYYY-MM-DD` (or an RFC 3339 timestamp, keeping only its date).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

fn compact_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([0-9]{1,2})[-/]([0-9]{1,2})[-/]?([0-9]{2})$").ok())
        .as_ref()
}

/// Parses the compact `D-M-YY` notation (`-` or `/` separators, year 20YY).
///
/// Returns `None` for out-of-range fields and for dates that do not exist,
/// such as `31-02-25`.
pub fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let captures = compact_pattern()?.captures(raw.trim())?;
    let day: u32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let year: i32 = captures[3].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

/// Human label for a day offset.
pub fn label(days: Option<i64>) -> String {
    match days {
        None => "-".to_string(),
        Some(days) if days < 0 => format!("Overdue by {} days", days.unsigned_abs()),
        Some(0) => "Today".to_string(),
        Some(1) => "Tomorrow".to_string(),
        Some(days) => format!("{days} days left"),
    }
}

pub fn channel_date(request: &EvidenceRequest, channel: DeadlineChannel) -> Option<NaiveDate> {
    match channel {
        DeadlineChannel::Primary => parse_calendar_date(&request.deadline_date),
        DeadlineChannel::Compact => parse_compact_date(&request.deadline_alt),
    }
}

/// Day arithmetic anchored to a fixed "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineEngine {
    today: NaiveDate,
}

impl DeadlineEngine {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn for_local_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Signed whole days from today to `date`; negative means overdue.
    pub fn days_until(&self, date: Option<NaiveDate>) -> Option<i64> {
        date.map(|target| target.signed_duration_since(self.today).num_days())
    }

    pub fn channel_days(&self, request: &EvidenceRequest, channel: DeadlineChannel) -> Option<i64> {
        self.days_until(channel_date(request, channel))
    }

    pub fn classify(
        &self,
        request: &EvidenceRequest,
        channel: DeadlineChannel,
        threshold: u32,
    ) -> Proximity {
        if request.is_fulfilled() {
            return Proximity::Closed;
        }

        match self.channel_days(request, channel) {
            None => Proximity::Unscheduled,
            Some(days) if days < 0 => Proximity::Overdue,
            Some(days) if days <= i64::from(threshold) => Proximity::Approaching,
            Some(_) => Proximity::OnTrack,
        }
    }

    pub fn view(&self, request: &EvidenceRequest, threshold: u32) -> DeadlineView {
        DeadlineView {
            request_id: request.id.clone(),
            description: request.description.clone(),
            status_label: request.status.label(),
            primary: self.channel_view(request, DeadlineChannel::Primary, threshold),
            compact: self.channel_view(request, DeadlineChannel::Compact, threshold),
        }
    }

    fn channel_view(
        &self,
        request: &EvidenceRequest,
        channel: DeadlineChannel,
        threshold: u32,
    ) -> ChannelView {
        let raw = match channel {
            DeadlineChannel::Primary => request.deadline_date.clone(),
            DeadlineChannel::Compact => request.deadline_alt.clone(),
        };
        let date = channel_date(request, channel);
        let days_until = self.days_until(date);

        ChannelView {
            channel,
            raw,
            date,
            days_until,
            label: label(days_until),
            proximity: self.classify(request, channel, threshold),
        }
    }

    /// Alert counts across `requests`, primary channel only.
    pub fn summary<'a, I>(&self, requests: I, threshold: u32) -> DeadlineSummary
    where
        I: IntoIterator<Item = &'a EvidenceRequest>,
    {
        requests
            .into_iter()
            .fold(DeadlineSummary::default(), |mut summary, request| {
                match self.classify(request, DeadlineChannel::Primary, threshold) {
                    Proximity::Approaching => summary.approaching += 1,
                    Proximity::Overdue => summary.overdue += 1,
                    Proximity::Closed | Proximity::Unscheduled | Proximity::OnTrack => {}
                }
                summary
            })
    }
}
