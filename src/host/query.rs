//! Host find request encoding and response decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{DateRange, HostRecord, RawRecord};

/// Host message code for "no records match the request".
const NO_RECORDS_MATCH: &str = "401";

/// Read request for the time-clock layout, filtered by clock-in date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchQuery {
    action: &'static str,
    dateformats: &'static str,
    layouts: String,
    query: Vec<TimeInDateCriterion>,
    version: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct TimeInDateCriterion {
    #[serde(rename = "TimeInDate")]
    time_in_date: String,
}

impl FetchQuery {
    pub fn for_range(layout: &str, range: &DateRange) -> Self {
        Self {
            action: "read",
            dateformats: "1",
            layouts: layout.to_string(),
            query: vec![TimeInDateCriterion {
                time_in_date: range.query_expression(),
            }],
            version: "vLatest",
        }
    }

    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    messages: Vec<HostMessage>,
    #[serde(default)]
    response: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
struct HostMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Unwrap `{"response":{"data":[{"fieldData":{...}}, ...]}}`.
///
/// A missing `response` or `data` is an empty batch, as is the host's
/// "no records match" message. Any other host error code, or a `data`
/// value that is not a list, is an error. A single malformed entry is not.
pub fn decode_response(text: &str) -> Result<Vec<RawRecord>> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| AppError::parse(format!("Host response is not a record list: {e}")))?;

    if let Some(msg) = envelope
        .messages
        .iter()
        .find(|m| !m.code.is_empty() && m.code != "0")
    {
        if msg.code == NO_RECORDS_MATCH {
            debug!("Host found no records: {}", msg.message);
            return Ok(Vec::new());
        }
        return Err(AppError::host(format!("{} (code {})", msg.message, msg.code)));
    }

    let Some(data) = envelope.response.and_then(|r| r.data) else {
        warn!("Host response carried no data");
        return Ok(Vec::new());
    };

    Ok(data
        .into_iter()
        .enumerate()
        .map(|(index, entry)| decode_record(index, entry))
        .collect())
}

/// A record that does not decode stays in the batch as an empty record so
/// aggregation reports it instead of the whole batch failing.
fn decode_record(index: usize, entry: Value) -> RawRecord {
    match serde_json::from_value::<HostRecord>(entry) {
        Ok(record) => record.into_raw(),
        Err(e) => {
            warn!("Record {index} is malformed: {e}");
            RawRecord::default()
        }
    }
}
