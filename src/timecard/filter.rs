//! Name search over an aggregate and the grand totals shown above it.

use serde::Serialize;

use crate::models::{AggregateResult, EmployeeSummary};

use super::rounding::{TimeFormat, round_to_quarter};

/// Employees whose name contains `term`, ignoring case, in aggregate order.
/// An empty term matches everyone.
pub fn filter_employees<'a>(result: &'a AggregateResult, term: &str) -> Vec<&'a EmployeeSummary> {
    if term.is_empty() {
        return result.employees().iter().collect();
    }

    let needle = term.to_lowercase();
    result
        .employees()
        .iter()
        .filter(|employee| employee.name.to_lowercase().contains(&needle))
        .collect()
}

/// Sums over a filtered set of employees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverallTotals {
    pub total_labor: f64,
    pub total_overtime: f64,
}

impl OverallTotals {
    /// Labor total as displayed: rounded to the quarter once more.
    pub fn labor_label(&self, format: TimeFormat) -> String {
        format.format(round_to_quarter(self.total_labor))
    }

    pub fn overtime_label(&self, format: TimeFormat) -> String {
        format.format(round_to_quarter(self.total_overtime))
    }
}

pub fn overall_totals(employees: &[&EmployeeSummary]) -> OverallTotals {
    employees.iter().fold(OverallTotals::default(), |acc, employee| OverallTotals {
        total_labor: acc.total_labor + employee.total_hours,
        total_overtime: acc.total_overtime + employee.total_overtime,
    })
}

/// What the dashboard shows for one search term.
#[derive(Debug, Clone)]
pub struct TimecardView<'a> {
    pub employees: Vec<&'a EmployeeSummary>,
    pub totals: OverallTotals,
}

pub fn build_view<'a>(result: &'a AggregateResult, term: &str) -> TimecardView<'a> {
    let employees = filter_employees(result, term);
    let totals = overall_totals(&employees);
    TimecardView { employees, totals }
}
