//! Time-clock records as the host delivers them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One record in the host's data-exchange format: the field values sit
/// inside a `fieldData` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRecord {
    #[serde(rename = "fieldData", default)]
    pub field_data: Option<RawRecord>,
}

impl HostRecord {
    /// Unwrap the envelope. A record without `fieldData` becomes an empty
    /// record, which aggregation then rejects as malformed.
    pub fn into_raw(self) -> RawRecord {
        self.field_data.unwrap_or_default()
    }
}

/// One clock-in/clock-out event.
///
/// Every field is optional on the wire; [`RawRecord::name`] and
/// [`RawRecord::date_time_in`] treat empty text as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Name", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(rename = "DateTimeIn", default, deserialize_with = "lenient_text")]
    pub date_time_in: Option<String>,
    #[serde(rename = "DateTimeOut", default, deserialize_with = "lenient_text")]
    pub date_time_out: Option<String>,
    #[serde(rename = "DayOfWeek", default, deserialize_with = "lenient_text")]
    pub day_of_week: Option<String>,
}

impl RawRecord {
    pub fn new(name: &str, date_time_in: &str, date_time_out: Option<&str>) -> Self {
        Self {
            name: Some(name.to_string()),
            date_time_in: Some(date_time_in.to_string()),
            date_time_out: date_time_out.map(str::to_string),
            day_of_week: None,
        }
    }

    pub fn with_day_of_week(mut self, label: &str) -> Self {
        self.day_of_week = Some(label.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    pub fn date_time_in(&self) -> Option<&str> {
        non_empty(&self.date_time_in)
    }

    pub fn date_time_out(&self) -> Option<&str> {
        non_empty(&self.date_time_out)
    }

    /// Advisory weekday label, passed through as-is.
    pub fn day_of_week(&self) -> &str {
        self.day_of_week.as_deref().unwrap_or("")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Accept strings, numbers, and booleans as text; null as missing.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected text field, found {other}"))),
    }
}
