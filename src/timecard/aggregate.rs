//! Fold raw punches into employee → week → day summaries.

use tracing::{debug, info, warn};

use crate::models::{AggregateResult, DayEntry, RawRecord, SkipReason, SkippedRecord};
use crate::timezone::{self, LocalZone};

use super::rounding::round_to_quarter;

/// Weekly hours paid at the regular rate.
pub const OVERTIME_THRESHOLD_HOURS: f64 = 40.0;

/// A record that passed validation, ready to be filed.
struct Punch<'a> {
    name: &'a str,
    entry: DayEntry,
    clock_out_unreadable: bool,
}

/// Build per-employee weekly summaries from a batch of punches.
///
/// Records are visited once in input order. Records without a name or a
/// readable clock-in are skipped and listed in the result's diagnostics.
/// Weekly regular/overtime figures are split at 40 hours and each part is
/// rounded to the quarter hour on its own; employee totals add up those
/// rounded figures.
pub fn aggregate(records: &[RawRecord], zone: &LocalZone) -> AggregateResult {
    let mut result = AggregateResult::default();

    for (index, record) in records.iter().enumerate() {
        let punch = match to_punch(record, zone) {
            Ok(punch) => punch,
            Err(reason) => {
                warn!(
                    "Skipping record {index} ({}): {:?}",
                    reason.describe(),
                    record
                );
                result.diagnostics.skipped.push(SkippedRecord {
                    index,
                    reason,
                    name: record.name().map(str::to_string),
                });
                continue;
            }
        };

        if punch.clock_out_unreadable {
            result.diagnostics.unparseable_clock_out += 1;
        }

        let week = result
            .employee_mut(punch.name)
            .week_mut(timezone::week_start(punch.entry.date));
        week.total_hours += punch.entry.total_hours;
        week.days.push(punch.entry);
    }

    settle_weeks(&mut result);

    info!(
        "Aggregated {} records into {} employees ({} skipped, {} unreadable clock-outs)",
        records.len(),
        result.len(),
        result.diagnostics.skipped.len(),
        result.diagnostics.unparseable_clock_out
    );

    result
}

fn to_punch<'a>(record: &'a RawRecord, zone: &LocalZone) -> Result<Punch<'a>, SkipReason> {
    let name = record.name().ok_or(SkipReason::MissingName)?;
    let clock_in_text = record.date_time_in().ok_or(SkipReason::MissingClockIn)?;
    let clock_in = zone
        .parse_datetime(clock_in_text)
        .ok_or(SkipReason::UnparseableClockIn)?;

    let clock_out_text = record.date_time_out();
    let clock_out = clock_out_text.and_then(|text| zone.parse_datetime(text));
    let clock_out_unreadable = clock_out_text.is_some() && clock_out.is_none();

    let total_hours = clock_out
        .as_ref()
        .map(|out| timezone::elapsed_hours(&clock_in, out))
        .unwrap_or(0.0);

    if total_hours < 0.0 {
        debug!("{name}: clock-out precedes clock-in at {clock_in_text} ({total_hours:.2} h)");
    }

    Ok(Punch {
        name,
        entry: DayEntry {
            date: clock_in.date_naive(),
            time_in: timezone::format_time_label(&clock_in),
            time_out: clock_out.as_ref().map(timezone::format_time_label).unwrap_or_default(),
            total_hours,
            day_of_week: record.day_of_week().to_string(),
            date_time_in: clock_in_text.to_string(),
            date_time_out: clock_out_text.map(str::to_string),
        },
        clock_out_unreadable,
    })
}

/// Second pass: split each week at the threshold and roll the rounded
/// figures up into the employee totals.
fn settle_weeks(result: &mut AggregateResult) {
    for employee in result.employees_mut() {
        for week in &mut employee.weeks {
            week.days.sort_by_key(|day| day.date);

            week.regular_hours = round_to_quarter(week.total_hours.min(OVERTIME_THRESHOLD_HOURS));
            week.overtime_hours = round_to_quarter((week.total_hours - OVERTIME_THRESHOLD_HOURS).max(0.0));

            employee.total_regular += week.regular_hours;
            employee.total_overtime += week.overtime_hours;
            employee.total_hours += week.regular_hours + week.overtime_hours;
        }
    }
}
