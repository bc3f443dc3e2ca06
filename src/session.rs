//! Dashboard controller: date selection, one load at a time, search,
//! display format and export status.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::export;
use crate::host::{HostDispatcher, HostTransport, RecordProvider};
use crate::models::{AggregateResult, DateRange, RawRecord};
use crate::timecard::{TimeFormat, TimecardView, aggregate, build_view};
use crate::timezone::LocalZone;

pub const NO_DATA_TO_EXPORT: &str = "No timecard data available to export";

/// Where the dashboard is in its load cycle.
#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    PickingDates,
    Loading {
        range: DateRange,
    },
    Loaded {
        range: DateRange,
        result: AggregateResult,
    },
    Failed {
        range: DateRange,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// Outcome of the last export, shown for a limited time.
#[derive(Debug, Clone)]
pub struct ExportStatus {
    pub kind: StatusKind,
    pub text: String,
    shown_at: Instant,
}

/// Main dashboard state.
#[derive(Debug)]
pub struct DashboardSession {
    zone: LocalZone,
    phase: Phase,
    time_format: TimeFormat,
    search_term: String,
    exporting: bool,
    export_status: Option<ExportStatus>,
    status_ttl: Duration,
}

impl DashboardSession {
    pub fn new(zone: LocalZone, time_format: TimeFormat, status_ttl: Duration) -> Self {
        Self {
            zone,
            phase: Phase::PickingDates,
            time_format,
            search_term: String::new(),
            exporting: false,
            export_status: None,
            status_ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            config.zone()?,
            config.display.time_format,
            Duration::from_secs(config.display.export_message_secs),
        ))
    }

    pub fn zone(&self) -> &LocalZone {
        &self.zone
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Range being loaded or shown, if any.
    pub fn range(&self) -> Option<&DateRange> {
        match &self.phase {
            Phase::PickingDates => None,
            Phase::Loading { range } | Phase::Loaded { range, .. } | Phase::Failed { range, .. } => Some(range),
        }
    }

    pub fn result(&self) -> Option<&AggregateResult> {
        match &self.phase {
            Phase::Loaded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Start loading `range`. Refused while another load is outstanding.
    pub fn begin_load(&mut self, range: DateRange) -> Result<()> {
        if self.is_loading() {
            warn!("Load for {} refused: request in flight", range.us_display());
            return Err(AppError::RequestInFlight);
        }
        info!("Loading timecards for {}", range.us_display());
        self.phase = Phase::Loading { range };
        Ok(())
    }

    /// Store the outcome of the outstanding load.
    ///
    /// A result that arrives after a reset is dropped.
    pub fn finish_load(&mut self, outcome: Result<Vec<RawRecord>>) {
        let Phase::Loading { range } = &self.phase else {
            debug!("Discarding load result: no load outstanding");
            return;
        };
        let range = *range;

        self.phase = match outcome {
            Ok(records) => {
                let result = aggregate(&records, &self.zone);
                info!(
                    "Loaded {} records, {} employees, {} warnings",
                    records.len(),
                    result.len(),
                    result.diagnostics.warning_count()
                );
                Phase::Loaded { range, result }
            }
            Err(e) => {
                warn!("Timecard load failed: {e}");
                Phase::Failed {
                    range,
                    message: format!("Failed to load timecard data: {e}"),
                }
            }
        };
    }

    /// Fetch `range` from `provider` and aggregate it.
    ///
    /// Only an admission failure is returned; a failed fetch leaves the
    /// session in [`Phase::Failed`].
    pub async fn load<P: RecordProvider>(&mut self, provider: &P, range: DateRange) -> Result<()> {
        self.begin_load(range)?;
        let outcome = provider.fetch(&range).await;
        self.finish_load(outcome);
        Ok(())
    }

    /// Back to date selection, dropping data, errors and export status.
    pub fn reset(&mut self) {
        self.phase = Phase::PickingDates;
        self.export_status = None;
        self.exporting = false;
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn set_time_format(&mut self, format: TimeFormat) {
        self.time_format = format;
    }

    pub fn toggle_time_format(&mut self) -> TimeFormat {
        self.time_format = self.time_format.toggled();
        self.time_format
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Employees matching the search term, with totals. `None` until loaded.
    pub fn view(&self) -> Option<TimecardView<'_>> {
        self.result().map(|result| build_view(result, &self.search_term))
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Render the loaded data for printing and mark an export as running.
    pub fn begin_export(&mut self, now: Instant) -> Result<String> {
        if self.exporting {
            return Err(AppError::RequestInFlight);
        }
        let html = match &self.phase {
            Phase::Loaded { range, result } if !result.is_empty() => {
                Some(export::render_html(result, Some(range), self.time_format))
            }
            _ => None,
        };
        let Some(html) = html else {
            self.set_status(StatusKind::Error, NO_DATA_TO_EXPORT, now);
            return Err(AppError::export(NO_DATA_TO_EXPORT));
        };
        self.exporting = true;
        self.export_status = None;
        Ok(html)
    }

    /// Record how the running export ended.
    pub fn finish_export(&mut self, outcome: &Result<()>, now: Instant) {
        self.exporting = false;
        match outcome {
            Ok(()) => self.set_status(StatusKind::Success, "Report exported", now),
            Err(e) => self.set_status(StatusKind::Error, &format!("Export failed: {e}"), now),
        }
    }

    /// Send the loaded report to the host's print script.
    pub async fn export_report<T: HostTransport>(
        &mut self,
        dispatcher: &HostDispatcher<T>,
        print_script: &str,
    ) -> Result<()> {
        let html = self.begin_export(Instant::now())?;
        let outcome = export::export_via_host(dispatcher, print_script, html).await;
        self.finish_export(&outcome, Instant::now());
        outcome
    }

    fn set_status(&mut self, kind: StatusKind, text: &str, now: Instant) {
        self.export_status = Some(ExportStatus {
            kind,
            text: text.to_string(),
            shown_at: now,
        });
    }

    /// Current export message, unless it has expired by `now`.
    pub fn export_status(&self, now: Instant) -> Option<&ExportStatus> {
        self.export_status
            .as_ref()
            .filter(|status| now.saturating_duration_since(status.shown_at) < self.status_ttl)
    }

    /// Drop an expired export message.
    pub fn clear_expired_status(&mut self, now: Instant) {
        if self.export_status(now).is_none() {
            self.export_status = None;
        }
    }
}
