//! Aggregated timecard view models.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// One processed punch within a week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayEntry {
    /// Local calendar day of the clock-in.
    pub date: NaiveDate,
    /// 12-hour clock-in time, e.g. `07:11 AM`.
    pub time_in: String,
    /// 12-hour clock-out time; empty for an open punch.
    pub time_out: String,
    /// Raw elapsed hours, never rounded. Zero for an open punch, negative
    /// for an inverted one.
    pub total_hours: f64,
    pub day_of_week: String,
    pub date_time_in: String,
    pub date_time_out: Option<String>,
}

/// All punches for one employee in one Monday-start week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    /// Always a Monday.
    pub week_start: NaiveDate,
    pub days: Vec<DayEntry>,
    /// Unrounded sum of the days' hours.
    pub total_hours: f64,
    /// `min(total, 40)` rounded to the quarter hour.
    pub regular_hours: f64,
    /// `max(total - 40, 0)` rounded to the quarter hour.
    pub overtime_hours: f64,
}

impl WeekSummary {
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            days: Vec::new(),
            total_hours: 0.0,
            regular_hours: 0.0,
            overtime_hours: 0.0,
        }
    }

    /// Sunday closing the week.
    pub fn week_end(&self) -> NaiveDate {
        self.week_start + Duration::days(6)
    }
}

/// One employee's weeks and running totals.
///
/// Totals are sums of the weeks' already-rounded figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub name: String,
    /// Ascending by `week_start`.
    pub weeks: Vec<WeekSummary>,
    pub total_regular: f64,
    pub total_overtime: f64,
    pub total_hours: f64,
}

impl EmployeeSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weeks: Vec::new(),
            total_regular: 0.0,
            total_overtime: 0.0,
            total_hours: 0.0,
        }
    }

    pub fn week(&self, week_start: NaiveDate) -> Option<&WeekSummary> {
        self.weeks
            .binary_search_by_key(&week_start, |w| w.week_start)
            .ok()
            .map(|idx| &self.weeks[idx])
    }

    /// Week for `week_start`, created in sorted position on first use.
    pub(crate) fn week_mut(&mut self, week_start: NaiveDate) -> &mut WeekSummary {
        let idx = match self.weeks.binary_search_by_key(&week_start, |w| w.week_start) {
            Ok(idx) => idx,
            Err(idx) => {
                self.weeks.insert(idx, WeekSummary::new(week_start));
                idx
            }
        };
        &mut self.weeks[idx]
    }
}

/// Why a record was left out of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingName,
    MissingClockIn,
    UnparseableClockIn,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::MissingName => "missing employee name",
            SkipReason::MissingClockIn => "missing clock-in time",
            SkipReason::UnparseableClockIn => "unparseable clock-in time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Position in the input batch.
    pub index: usize,
    pub reason: SkipReason,
    pub name: Option<String>,
}

/// Per-batch data quality counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateDiagnostics {
    pub skipped: Vec<SkippedRecord>,
    /// Records kept with zero hours because the clock-out could not be read.
    pub unparseable_clock_out: usize,
}

impl AggregateDiagnostics {
    pub fn warning_count(&self) -> usize {
        self.skipped.len() + self.unparseable_clock_out
    }
}

/// Employee summaries in first-seen order with a name lookup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    employees: Vec<EmployeeSummary>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    pub diagnostics: AggregateDiagnostics,
}

impl AggregateResult {
    pub fn employees(&self) -> &[EmployeeSummary] {
        &self.employees
    }

    pub fn get(&self, name: &str) -> Option<&EmployeeSummary> {
        self.index.get(name).map(|&idx| &self.employees[idx])
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    /// Summary for `name`, appended on first use.
    pub(crate) fn employee_mut(&mut self, name: &str) -> &mut EmployeeSummary {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.employees.push(EmployeeSummary::new(name));
                let idx = self.employees.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.employees[idx]
    }

    pub(crate) fn employees_mut(&mut self) -> impl Iterator<Item = &mut EmployeeSummary> {
        self.employees.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weeks_stay_sorted() {
        let mut employee = EmployeeSummary::new("Alice");
        employee.week_mut(ymd(2025, 7, 21));
        employee.week_mut(ymd(2025, 7, 7));
        employee.week_mut(ymd(2025, 7, 14));
        employee.week_mut(ymd(2025, 7, 7));

        let starts: Vec<_> = employee.weeks.iter().map(|w| w.week_start).collect();
        assert_eq!(starts, vec![ymd(2025, 7, 7), ymd(2025, 7, 14), ymd(2025, 7, 21)]);
        assert!(employee.week(ymd(2025, 7, 14)).is_some());
        assert!(employee.week(ymd(2025, 7, 28)).is_none());
    }

    #[test]
    fn test_week_end_is_sunday() {
        let week = WeekSummary::new(ymd(2025, 12, 29));
        assert_eq!(week.week_end(), ymd(2026, 1, 4));
    }

    #[test]
    fn test_employees_keep_first_seen_order() {
        let mut result = AggregateResult::default();
        result.employee_mut("Zoe");
        result.employee_mut("Adam");
        result.employee_mut("Zoe");

        let names: Vec<_> = result.employees().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zoe", "Adam"]);
        assert_eq!(result.get("Adam").unwrap().name, "Adam");
        assert!(result.get("adam").is_none());
    }
}
