//! Local sample data used when no host is attached.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::models::{DateRange, RawRecord};
use crate::timezone::LocalZone;

use super::RecordProvider;
use super::query::decode_response;

/// Reads a saved host response from disk instead of calling the host.
#[derive(Debug, Clone)]
pub struct SampleSource {
    path: PathBuf,
    zone: LocalZone,
}

impl SampleSource {
    pub fn new(path: impl Into<PathBuf>, zone: LocalZone) -> Self {
        Self {
            path: path.into(),
            zone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, ignoring any date range.
    pub async fn load_all(&self) -> Result<Vec<RawRecord>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        decode_response(&text)
    }
}

/// Keep records clocked in within `range`.
///
/// Records whose clock-in cannot be read are kept so that aggregation can
/// report them.
pub fn retain_in_range(records: Vec<RawRecord>, range: &DateRange, zone: &LocalZone) -> Vec<RawRecord> {
    records
        .into_iter()
        .filter(|record| {
            match record.date_time_in().and_then(|text| zone.local_date(text)) {
                Some(date) => range.contains(date),
                None => true,
            }
        })
        .collect()
}

impl RecordProvider for SampleSource {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<RawRecord>> {
        let all = self.load_all().await?;
        let total = all.len();
        let records = retain_in_range(all, range, &self.zone);
        info!(
            "Loaded {} of {total} sample records from {:?} for {}",
            records.len(),
            self.path,
            range.us_display()
        );
        Ok(records)
    }
}
