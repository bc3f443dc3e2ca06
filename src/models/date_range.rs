//! Submitted date range and its host encodings.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{AppError, Result};
use crate::timezone::{self, LocalZone};

/// Parse date from multiple formats: "2000-1-1", "2000/1/1", "2000 1 1", "2000.1.1"
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();

    // Split by common separators: - / space .
    let parts: Vec<&str> = input
        .split(['-', '/', ' ', '.'])
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() != 3 {
        return None;
    }

    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_user_date(input: &str) -> Option<NaiveDate> {
    timezone::parse_us_date(input).or_else(|| parse_flexible_date(input))
}

/// Inclusive start/end pair chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::validation("Start date must be before end date"));
        }
        Ok(Self { start, end })
    }

    /// Build from user-typed dates, `MM/DD/YYYY` or year-first.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start_date =
            parse_user_date(start).ok_or_else(|| AppError::validation(format!("Invalid start date: '{start}'")))?;
        let end_date =
            parse_user_date(end).ok_or_else(|| AppError::validation(format!("Invalid end date: '{end}'")))?;
        Self::new(start_date, end_date)
    }

    /// Monday through Sunday of the current week.
    pub fn current_week(zone: &LocalZone) -> Self {
        let start = timezone::week_start(zone.today());
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        timezone::is_date_in_range(date, self.start, self.end)
    }

    /// `YYYY-MM-DD`
    pub fn start_display(&self) -> String {
        timezone::iso_date(self.start)
    }

    /// `YYYY-MM-DD`
    pub fn end_display(&self) -> String {
        timezone::iso_date(self.end)
    }

    /// `YYYY+MM+DD`, the host query language's date form.
    pub fn start_query(&self) -> String {
        query_date(self.start)
    }

    pub fn end_query(&self) -> String {
        query_date(self.end)
    }

    /// `start...end` range expression for a host find request.
    pub fn query_expression(&self) -> String {
        format!("{}...{}", self.start_query(), self.end_query())
    }

    /// `MM/DD/YYYY - MM/DD/YYYY`
    pub fn us_display(&self) -> String {
        timezone::format_range_for_us_display(self.start, self.end)
    }
}

fn query_date(date: NaiveDate) -> String {
    format!("{:04}+{:02}+{:02}", date.year(), date.month(), date.day())
}
