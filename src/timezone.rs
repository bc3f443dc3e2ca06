//! Local-time conversion for host datetime strings.
//!
//! The host hands over wall-clock readings without an offset. They are
//! interpreted in an explicit [`LocalZone`] rather than whatever zone the
//! process happens to run in, so the same records always land on the same
//! calendar days and weeks.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{AppError, Result};

/// Zone used when configuration does not name one.
pub const DEFAULT_TIMEZONE: &str = "America/Edmonton";

/// Datetime layouts accepted from the host, most common first.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Date-only layout; the time is taken as local midnight.
const DATE_FORMAT: &str = "%m/%d/%Y";

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const US_DATE_FORMAT: &str = "%m/%d/%Y";
const TIME_LABEL_FORMAT: &str = "%I:%M %p";

const MS_PER_HOUR: f64 = 3_600_000.0;

/// The zone every host datetime is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone(Tz);

impl LocalZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Look up an IANA zone name such as `America/Edmonton`.
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|e| AppError::Timezone(format!("Unknown time zone '{name}': {e}")))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Current calendar day in this zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.0).date_naive()
    }

    /// Parse a host datetime string as a wall-clock reading in this zone.
    ///
    /// Returns `None` for empty or unrecognised input. A reading repeated by a
    /// fall-back transition resolves to the earlier instant; one skipped by a
    /// spring-forward gap is moved one hour later.
    pub fn parse_datetime(&self, text: &str) -> Option<DateTime<Tz>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(naive) = parse_naive(text) else {
            warn!("Invalid date string: {text}");
            return None;
        };

        Some(self.resolve(naive))
    }

    fn resolve(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.0.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let shifted = naive + Duration::hours(1);
                self.0
                    .from_local_datetime(&shifted)
                    .earliest()
                    .unwrap_or_else(|| self.0.from_utc_datetime(&naive))
            }
        }
    }

    /// Calendar day of a host datetime, in this zone.
    pub fn local_date(&self, text: &str) -> Option<NaiveDate> {
        self.parse_datetime(text).map(|dt| dt.date_naive())
    }

    /// 12-hour display time (`07:11 AM`), or an empty string when the value is
    /// missing or unparseable.
    pub fn time_label(&self, text: Option<&str>) -> String {
        text.and_then(|t| self.parse_datetime(t))
            .map(|dt| format_time_label(&dt))
            .unwrap_or_default()
    }

    /// Elapsed hours from clock-in to clock-out.
    ///
    /// Zero when either side is missing or unparseable. Negative when the
    /// clock-out precedes the clock-in.
    pub fn hours_between(&self, time_in: &str, time_out: Option<&str>) -> f64 {
        let (Some(start), Some(end)) = (
            self.parse_datetime(time_in),
            time_out.and_then(|t| self.parse_datetime(t)),
        ) else {
            return 0.0;
        };

        elapsed_hours(&start, &end)
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        Self(chrono_tz::America::Edmonton)
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Signed hours between two instants, at millisecond precision.
pub fn elapsed_hours(start: &DateTime<Tz>, end: &DateTime<Tz>) -> f64 {
    (end.timestamp_millis() - start.timestamp_millis()) as f64 / MS_PER_HOUR
}

pub fn format_time_label(dt: &DateTime<Tz>) -> String {
    dt.format(TIME_LABEL_FORMAT).to_string()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), ISO_DATE_FORMAT).ok()
}

/// `MM/DD/YYYY`.
pub fn format_us_date(date: NaiveDate) -> String {
    date.format(US_DATE_FORMAT).to_string()
}

pub fn parse_us_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), US_DATE_FORMAT).ok()
}

/// Convert an ISO date string to US display form; empty for invalid input.
pub fn format_iso_as_us(text: &str) -> String {
    parse_iso_date(text).map(format_us_date).unwrap_or_default()
}

/// `MM/DD/YYYY - MM/DD/YYYY`.
pub fn format_range_for_us_display(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", format_us_date(start), format_us_date(end))
}

/// Inclusive on both ends.
pub fn is_date_in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date <= end
}
