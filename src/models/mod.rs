//! Data models for host records, date ranges, and timecard summaries.

pub mod date_range;
pub mod record;
pub mod timecard;

pub use date_range::{DateRange, parse_flexible_date};
pub use record::{HostRecord, RawRecord};
pub use timecard::{AggregateDiagnostics, AggregateResult, DayEntry, EmployeeSummary, SkipReason, SkippedRecord, WeekSummary};
