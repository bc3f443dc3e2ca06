//! Host integration: correlated script calls, the timecard fetch request,
//! and the sample-data fallback.
//!
//! # Example
//!
//! ```ignore
//! use timecard_dashboard::host::{HostDispatcher, HostRecordProvider, RecordProvider};
//!
//! let provider = HostRecordProvider::new(HostDispatcher::new(transport), "js * fetchData", "TimeClock");
//! let records = provider.fetch(&range).await?;
//! ```

mod bridge;
mod query;
mod sample;

use std::future::Future;

use crate::error::Result;
use crate::models::{DateRange, RawRecord};

pub use bridge::{
    HostCompleter, HostCompletion, HostDispatcher, HostOutcome, HostRequest, HostTransport, JsonLinesTransport,
};
pub use query::{FetchQuery, decode_response};
pub use sample::{SampleSource, retain_in_range};

/// Where a batch of punches for a date range comes from.
pub trait RecordProvider {
    fn fetch(&self, range: &DateRange) -> impl Future<Output = Result<Vec<RawRecord>>> + Send;
}

/// Fetches punches by running the host's fetch script.
pub struct HostRecordProvider<T> {
    dispatcher: HostDispatcher<T>,
    fetch_script: String,
    layout: String,
}

impl<T: HostTransport> HostRecordProvider<T> {
    pub fn new(dispatcher: HostDispatcher<T>, fetch_script: &str, layout: &str) -> Self {
        Self {
            dispatcher,
            fetch_script: fetch_script.to_string(),
            layout: layout.to_string(),
        }
    }

    /// The dispatcher, for other script calls such as report printing.
    pub fn dispatcher(&self) -> &HostDispatcher<T> {
        &self.dispatcher
    }
}

impl<T: HostTransport> RecordProvider for HostRecordProvider<T> {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<RawRecord>> {
        let payload = FetchQuery::for_range(&self.layout, range).to_payload()?;
        let text = self.dispatcher.perform_script(&self.fetch_script, payload).await?;
        decode_response(&text)
    }
}
