//! Report export: printable HTML through the host, or an Excel workbook.

use std::fmt::Write as _;
use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::host::{HostDispatcher, HostTransport};
use crate::models::{AggregateResult, DateRange, EmployeeSummary, WeekSummary};
use crate::timecard::{TimeFormat, build_view, round_to_quarter};
use crate::timezone::{format_us_date, iso_date};

const REPORT_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', sans-serif;
  background-color: #f8fafc;
  color: #334155;
  line-height: 1.6;
  padding: 20px;
}
.timecard-report { max-width: 1400px; margin: 0 auto; background: white; }
.header-section { padding: 16px 24px; border-bottom: 2px solid #e2e8f0; }
.stats-section { display: flex; gap: 32px; flex-wrap: wrap; }
.stat-label { font-weight: 600; margin-right: 6px; }
.stat-value { font-variant-numeric: tabular-nums; }
.employee-cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(420px, 1fr)); gap: 16px; padding: 16px; }
.employee-card { border: 1px solid #e2e8f0; border-radius: 8px; page-break-inside: avoid; }
.employee-header { padding: 12px 16px; background: #f1f5f9; border-bottom: 1px solid #e2e8f0; }
.employee-name { font-size: 1.1rem; margin-bottom: 4px; }
.employee-totals { display: flex; gap: 16px; font-size: 0.9rem; }
.overtime-hours { color: #b91c1c; }
.week-header { display: flex; justify-content: space-between; align-items: center; padding: 8px 16px; cursor: pointer; }
.week-totals { display: flex; gap: 12px; font-size: 0.85rem; }
.expand-icon { transition: transform 0.2s; }
.expand-icon.expanded { transform: rotate(180deg); }
.week-details { padding: 0 16px 8px; }
.day-record { display: grid; grid-template-columns: 1fr 2fr 1fr 1fr; font-size: 0.85rem; padding: 2px 0; border-top: 1px dashed #e2e8f0; }
.day-hours { text-align: right; }
@media print { body { background: white; padding: 0; } .week-details { display: block !important; } }
"#;

const REPORT_SCRIPT: &str = r#"
function toggleWeek(weekKey) {
  var details = document.getElementById('details-' + weekKey);
  var icon = document.getElementById('icon-' + weekKey);
  if (details.style.display === 'none' || details.style.display === '') {
    details.style.display = 'block';
    icon.classList.add('expanded');
  } else {
    details.style.display = 'none';
    icon.classList.remove('expanded');
  }
}
"#;

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render every employee in `result` as a standalone HTML document.
///
/// Header totals and each employee's totals are rounded to the quarter once
/// more before display; week figures are shown as stored.
pub fn render_html(result: &AggregateResult, range: Option<&DateRange>, format: TimeFormat) -> String {
    let view = build_view(result, "");
    let title = match range {
        Some(range) => format!("{} to {}", range.start_display(), range.end_display()),
        None => "All Data".to_string(),
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(html, "<title>Timecard Report - {}</title>", escape_html(&title));
    let _ = writeln!(html, "<style>{REPORT_CSS}</style>");
    html.push_str("</head>\n<body>\n<div class=\"timecard-report\">\n");

    html.push_str("<div class=\"header-section\"><div class=\"stats-section\">\n");
    push_stat(&mut html, "Total Labor:", &view.totals.labor_label(format));
    push_stat(&mut html, "Total Overtime:", &view.totals.overtime_label(format));
    if let Some(range) = range {
        push_stat(&mut html, "Pay Period:", &range.us_display());
    }
    html.push_str("</div></div>\n");

    html.push_str("<div class=\"employee-cards\">\n");
    for (emp_idx, employee) in view.employees.iter().enumerate() {
        push_employee(&mut html, emp_idx, employee, format);
    }
    html.push_str("</div>\n</div>\n");

    let _ = writeln!(html, "<script>{REPORT_SCRIPT}</script>");
    html.push_str("</body>\n</html>\n");
    html
}

fn push_stat(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<div class=\"stat-item\"><span class=\"stat-label\">{}</span><span class=\"stat-value\">{}</span></div>",
        escape_html(label),
        escape_html(value)
    );
}

fn push_employee(html: &mut String, emp_idx: usize, employee: &EmployeeSummary, format: TimeFormat) {
    html.push_str("<div class=\"employee-card\">\n<div class=\"employee-header\">\n");
    let _ = writeln!(html, "<h3 class=\"employee-name\">{}</h3>", escape_html(&employee.name));
    let _ = writeln!(
        html,
        "<div class=\"employee-totals\">\
         <span class=\"total-hours\">Total: {}</span>\
         <span class=\"regular-hours\">Regular: {}</span>\
         <span class=\"overtime-hours\">Overtime: {}</span></div>",
        format.format(round_to_quarter(employee.total_hours)),
        format.format(round_to_quarter(employee.total_regular)),
        format.format(round_to_quarter(employee.total_overtime)),
    );
    html.push_str("</div>\n<div class=\"weekly-summaries\">\n");
    for (week_idx, week) in employee.weeks.iter().enumerate() {
        push_week(html, &format!("w{emp_idx}-{week_idx}"), week, format);
    }
    html.push_str("</div>\n</div>\n");
}

fn push_week(html: &mut String, key: &str, week: &WeekSummary, format: TimeFormat) {
    html.push_str("<div class=\"week-summary\">\n");
    let _ = writeln!(
        html,
        "<div class=\"week-header\" onclick=\"toggleWeek('{key}')\">\
         <span class=\"week-dates\">Week of {} - {}</span>\
         <div class=\"week-totals\"><span class=\"week-regular\">Reg: {}</span>\
         <span class=\"week-overtime\">OT: {}</span></div>\
         <span class=\"expand-icon\" id=\"icon-{key}\">&#9660;</span></div>",
        format_us_date(week.week_start),
        format_us_date(week.week_end()),
        format.format(week.regular_hours),
        format.format(week.overtime_hours),
    );
    let _ = writeln!(
        html,
        "<div class=\"week-details\" id=\"details-{key}\" style=\"display: none;\">"
    );
    for day in &week.days {
        let _ = writeln!(
            html,
            "<div class=\"day-record\"><span class=\"day-date\">{}</span>\
             <span class=\"day-times\">{} - {}</span>\
             <span class=\"day-info\">{}</span>\
             <span class=\"day-hours\">{} hrs</span></div>",
            format_us_date(day.date),
            escape_html(&day.time_in),
            escape_html(&day.time_out),
            escape_html(&day.day_of_week),
            format.format(day.total_hours),
        );
    }
    html.push_str("</div>\n</div>\n");
}

#[derive(Debug, Deserialize)]
struct PrintReply {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Hand the rendered report to the host's print script.
///
/// A reply object with a non-empty `error` field is a failed export. Any
/// other reply, including plain text, counts as success.
pub async fn export_via_host<T: HostTransport>(
    dispatcher: &HostDispatcher<T>,
    script: &str,
    html: String,
) -> Result<()> {
    let reply = dispatcher
        .perform_script(script, html)
        .await
        .map_err(|e| match e {
            AppError::Host(message) => AppError::Export(message),
            other => other,
        })?;

    if let Ok(PrintReply { error: Some(err) }) = serde_json::from_str::<PrintReply>(&reply) {
        let message = match err {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null | serde_json::Value::Bool(false) => String::new(),
            other => other.to_string(),
        };
        if !message.is_empty() {
            error!("Print script reported: {message}");
            return Err(AppError::Export(message));
        }
    }

    info!("Report sent to '{script}'");
    Ok(())
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

/// Cell format and value scale for hours. The hours-and-minutes mode
/// writes Excel durations, which count in days.
fn hours_cell(format: TimeFormat) -> (Format, f64) {
    match format {
        TimeFormat::Decimal => (Format::new().set_num_format("0.00"), 1.0),
        TimeFormat::HoursMinutes => (Format::new().set_num_format("[h]:mm"), 1.0 / 24.0),
    }
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], widths: &[f64]) -> Result<()> {
    let header_format = header_format();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

/// Write a weekly summary sheet and a per-day detail sheet.
pub fn export_to_excel(result: &AggregateResult, format: TimeFormat, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let (hours_format, scale) = hours_cell(format);

    let summary = workbook.add_worksheet();
    summary.set_name("Weekly Summary")?;
    write_headers(
        summary,
        &["Employee", "Week Start", "Week End", "Hours", "Regular", "Overtime"],
        &[30.0, 12.0, 12.0, 10.0, 10.0, 10.0],
    )?;

    let mut row = 0u32;
    for employee in result.employees() {
        for week in &employee.weeks {
            row += 1;
            summary.write_string(row, 0, &employee.name)?;
            summary.write_string(row, 1, iso_date(week.week_start))?;
            summary.write_string(row, 2, iso_date(week.week_end()))?;
            summary.write_number_with_format(row, 3, week.total_hours * scale, &hours_format)?;
            summary.write_number_with_format(row, 4, week.regular_hours * scale, &hours_format)?;
            summary.write_number_with_format(row, 5, week.overtime_hours * scale, &hours_format)?;
        }
    }
    if row > 0 {
        summary.autofilter(0, 0, row, 5)?;
    }
    summary.set_freeze_panes(1, 0)?;

    let detail = workbook.add_worksheet();
    detail.set_name("Day Detail")?;
    write_headers(
        detail,
        &["Employee", "Week Start", "Date", "Day", "Time In", "Time Out", "Hours"],
        &[30.0, 12.0, 12.0, 12.0, 10.0, 10.0, 10.0],
    )?;

    let mut row = 0u32;
    for employee in result.employees() {
        for week in &employee.weeks {
            for day in &week.days {
                row += 1;
                detail.write_string(row, 0, &employee.name)?;
                detail.write_string(row, 1, iso_date(week.week_start))?;
                detail.write_string(row, 2, iso_date(day.date))?;
                detail.write_string(row, 3, &day.day_of_week)?;
                detail.write_string(row, 4, &day.time_in)?;
                detail.write_string(row, 5, &day.time_out)?;
                detail.write_number_with_format(row, 6, day.total_hours * scale, &hours_format)?;
            }
        }
    }
    if row > 0 {
        detail.autofilter(0, 0, row, 6)?;
    }
    detail.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    info!("Wrote {} employees to {:?}", result.len(), path);
    Ok(())
}

/// Generate a default filename for an export, stamped with local time.
pub fn generate_export_filename(prefix: &str, ext: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.{ext}", ts = now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCompletion, HostRequest};
    use crate::models::RawRecord;
    use crate::timecard::aggregate;
    use crate::timezone::LocalZone;
    use chrono::NaiveDate;
    use tokio::sync::mpsc;

    fn sample_result() -> AggregateResult {
        let records = vec![
            RawRecord::new("Ann <Lead>", "7/14/2025 07:00:00", Some("7/14/2025 17:00:00")).with_day_of_week("Monday"),
            RawRecord::new("Ann <Lead>", "7/15/2025 07:00:00", Some("7/15/2025 17:00:00")),
            RawRecord::new("Ann <Lead>", "7/16/2025 07:00:00", Some("7/16/2025 17:00:00")),
            RawRecord::new("Ann <Lead>", "7/17/2025 07:00:00", Some("7/17/2025 17:00:00")),
            RawRecord::new("Ann <Lead>", "7/18/2025 07:00:00", Some("7/18/2025 12:00:00")),
            RawRecord::new("Bo", "7/21/2025 09:00:00", Some("7/21/2025 17:30:00")),
        ];
        aggregate(&records, &LocalZone::default())
    }

    fn july_range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 27).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_html_content() {
        let html = render_html(&sample_result(), Some(&july_range()), TimeFormat::Decimal);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Timecard Report - 2025-07-14 to 2025-07-27</title>"));
        assert!(html.contains("Ann &lt;Lead&gt;"));
        assert!(!html.contains("Ann <Lead>"));
        assert!(html.contains("Week of 07/14/2025 - 07/20/2025"));
        assert!(html.contains("Week of 07/21/2025 - 07/27/2025"));
        assert!(html.contains("Reg: 40.00"));
        assert!(html.contains("OT: 5.00"));
        assert!(html.contains("Total Labor:</span><span class=\"stat-value\">53.50"));
        assert!(html.contains("Total Overtime:</span><span class=\"stat-value\">5.00"));
        assert!(html.contains("Pay Period:</span><span class=\"stat-value\">07/14/2025 - 07/27/2025"));
        assert!(html.contains("07:00 AM - 05:00 PM"));
        assert!(html.contains("10.00 hrs"));
        assert!(html.contains("function toggleWeek"));
    }

    #[test]
    fn test_render_html_without_range_and_hhmm() {
        let html = render_html(&sample_result(), None, TimeFormat::HoursMinutes);

        assert!(html.contains("Timecard Report - All Data"));
        assert!(!html.contains("Pay Period"));
        assert!(html.contains("8:30 hrs"));
        assert!(html.contains("Total Labor:</span><span class=\"stat-value\">53:30"));
    }

    struct ChannelTransport(mpsc::UnboundedSender<HostRequest>);

    impl HostTransport for ChannelTransport {
        fn send(&self, request: &HostRequest) -> Result<()> {
            self.0
                .send(request.clone())
                .map_err(|_| AppError::HostUnavailable("closed".into()))
        }
    }

    async fn print_with_reply(reply: &'static str) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = HostDispatcher::new(ChannelTransport(tx));
        let completer = dispatcher.completer();

        tokio::spawn(async move {
            let request = rx.recv().await.unwrap();
            assert_eq!(request.script, "js * print");
            assert!(request.payload.starts_with("<!DOCTYPE html>"));
            completer.complete(HostCompletion::response(request.id, reply)).unwrap();
        });

        let html = render_html(&sample_result(), None, TimeFormat::Decimal);
        export_via_host(&dispatcher, "js * print", html).await
    }

    #[tokio::test]
    async fn test_export_via_host_success() {
        assert!(print_with_reply("").await.is_ok());
        assert!(print_with_reply(r#"{"ok":true}"#).await.is_ok());
        assert!(print_with_reply(r#"{"error":""}"#).await.is_ok());
    }

    #[tokio::test]
    async fn test_export_via_host_error_field() {
        let err = print_with_reply(r#"{"error":"Printer offline"}"#).await.unwrap_err();
        assert!(matches!(err, AppError::Export(ref m) if m == "Printer offline"));
    }

    #[test]
    fn test_export_to_excel_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timecards.xlsx");

        export_to_excel(&sample_result(), TimeFormat::Decimal, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        let path = dir.path().join("empty.xlsx");
        export_to_excel(&AggregateResult::default(), TimeFormat::HoursMinutes, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_generate_export_filename() {
        let name = generate_export_filename("timecards", "xlsx");
        assert!(name.starts_with("timecards_"));
        assert!(name.ends_with(".xlsx"));
        // prefix + '_' + YYYYMMDD_HHMMSS + ".xlsx"
        assert_eq!(name.len(), "timecards_".len() + 15 + ".xlsx".len());
    }
}
