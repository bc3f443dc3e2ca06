//! Timecard aggregation engine.
//!
//! Turns a flat batch of clock punches into per-employee weekly summaries
//! with a regular/overtime split at 40 hours and quarter-hour rounding.
//! Pure computation: no I/O, no host calls.
//!
//! # Example
//!
//! ```
//! use timecard_dashboard::models::RawRecord;
//! use timecard_dashboard::timecard::{aggregate, build_view, TimeFormat};
//! use timecard_dashboard::timezone::LocalZone;
//!
//! let records = vec![RawRecord::new("Alice", "7/14/2025 09:00:00", Some("7/14/2025 17:30:00"))];
//! let result = aggregate(&records, &LocalZone::default());
//! let view = build_view(&result, "ali");
//! assert_eq!(view.totals.labor_label(TimeFormat::Decimal), "8.50");
//! ```

mod aggregate;
mod filter;
mod rounding;


pub use aggregate::{OVERTIME_THRESHOLD_HOURS, aggregate};
pub use filter::{OverallTotals, TimecardView, build_view, filter_employees, overall_totals};
pub use rounding::{TimeFormat, round_to_quarter};
