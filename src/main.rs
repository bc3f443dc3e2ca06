//! Timecard Dashboard - weekly regular/overtime summaries from time-clock punches.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use timecard_dashboard as app;

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::export;
use app::host::{HostDispatcher, HostRecordProvider, JsonLinesTransport, SampleSource};
use app::models::DateRange;
use app::session::{DashboardSession, Phase};
use app::timecard::TimeFormat;

/// Weekly timecard summaries with regular and overtime hours.
#[derive(Parser)]
#[command(name = "timecard-dashboard", version)]
struct Cli {
    /// First day of the pay period (YYYY-MM-DD or MM/DD/YYYY); defaults to this week
    #[arg(long)]
    start: Option<String>,

    /// Last day of the pay period
    #[arg(long)]
    end: Option<String>,

    /// Saved host response to read instead of the configured sample data
    #[arg(long)]
    input: Option<PathBuf>,

    /// Only show employees whose name contains this text
    #[arg(long, default_value = "")]
    search: String,

    /// Hour display: decimal or hhmm
    #[arg(long)]
    format: Option<TimeFormat>,

    /// IANA time zone the punches were recorded in
    #[arg(long)]
    timezone: Option<String>,

    /// Write the printable HTML report (default name when no path is given)
    #[arg(long)]
    html: Option<Option<PathBuf>>,

    /// Write an Excel workbook (default name when no path is given)
    #[arg(long)]
    xlsx: Option<Option<PathBuf>>,

    /// Print the aggregate as JSON instead of the console dashboard
    #[arg(long)]
    json: bool,

    /// Talk to a host over stdin/stdout instead of reading sample data
    #[arg(long)]
    host_stdio: bool,

    /// With --host-stdio, send the report to the host's print script
    #[arg(long, requires = "host_stdio")]
    print: bool,

    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = if cli.dev {
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };

    let (mut config, load_note) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, None),
        ConfigLoadResult::Missing => (AppConfig::default(), None),
        ConfigLoadResult::Invalid(e) => (AppConfig::default(), Some(e.to_string())),
    };

    if let Some(name) = &cli.timezone {
        config.timezone.name = name.clone();
    }
    if let Some(format) = cli.format {
        config.display.time_format = format;
    }
    if let Some(input) = &cli.input {
        config.host.sample_data = input.clone();
    }
    config.validate().context("Invalid settings")?;

    let _log_guard = init_logging(&config.logging);

    tracing::info!("Timecard Dashboard starting...");
    tracing::info!("Config path: {:?}", config_path);
    if let Some(err) = load_note {
        tracing::warn!("Config invalid, using defaults: {}", err);
    }

    let mut session = DashboardSession::from_config(&config)?;
    session.set_search_term(cli.search.clone());

    let range = match (&cli.start, &cli.end) {
        (Some(start), Some(end)) => DateRange::parse(start, end)?,
        (None, None) => DateRange::current_week(session.zone()),
        _ => bail!("--start and --end must be given together"),
    };

    if cli.host_stdio {
        run_with_host(&cli, &config, &mut session, range).await?;
    } else {
        let source = SampleSource::new(&config.host.sample_data, *session.zone());
        tracing::info!("No host attached, reading {:?}", source.path());
        session.load(&source, range).await?;
    }

    if let Phase::Failed { message, .. } = session.phase() {
        bail!("{message}");
    }

    // Requests own stdout in host mode
    if cli.host_stdio {
        write_output(&cli, &session, &mut std::io::stderr().lock())?;
    } else {
        write_output(&cli, &session, &mut std::io::stdout().lock())?;
    }

    write_files(&cli, &session)?;
    Ok(())
}

/// Console logging, plus a daily file when a log directory is configured.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "timecard-dashboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// Fetch through a host speaking JSON lines: requests on stdout, completions
/// on stdin.
async fn run_with_host(
    cli: &Cli,
    config: &AppConfig,
    session: &mut DashboardSession,
    range: DateRange,
) -> anyhow::Result<()> {
    let dispatcher = HostDispatcher::new(JsonLinesTransport::new(std::io::stdout()));
    let completer = dispatcher.completer();

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if let Err(e) = completer.complete_json(&line) {
                        tracing::warn!("Ignoring host line: {}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Host input closed: {}", e);
                    break;
                }
            }
        }
    });

    let provider = HostRecordProvider::new(dispatcher, &config.host.fetch_script, &config.host.layout);
    session.load(&provider, range).await?;

    if cli.print && session.result().is_some() {
        match session
            .export_report(provider.dispatcher(), &config.host.print_script)
            .await
        {
            Ok(()) => tracing::info!("Report sent to the host for printing"),
            Err(e) => tracing::error!("Print failed: {}", e),
        }
    }

    reader.abort();
    Ok(())
}

fn write_output(cli: &Cli, session: &DashboardSession, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(result) = session.result() else {
        return Ok(());
    };

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, result)?;
        writeln!(out)?;
        return Ok(());
    }

    let format = session.time_format();
    let Some(view) = session.view() else {
        return Ok(());
    };

    if let Some(range) = session.range() {
        writeln!(out, "Pay Period: {}", range.us_display())?;
    }
    writeln!(
        out,
        "Total Labor: {}   Total Overtime: {}",
        view.totals.labor_label(format),
        view.totals.overtime_label(format)
    )?;

    if result.is_empty() {
        writeln!(out, "\nNo timecard data for this period.")?;
    } else if view.employees.is_empty() {
        writeln!(out, "\nNo employees match '{}'.", session.search_term())?;
    }

    for employee in &view.employees {
        writeln!(
            out,
            "\n{}   Total: {}  Regular: {}  Overtime: {}",
            employee.name,
            format.format(app::timecard::round_to_quarter(employee.total_hours)),
            format.format(app::timecard::round_to_quarter(employee.total_regular)),
            format.format(app::timecard::round_to_quarter(employee.total_overtime)),
        )?;
        for week in &employee.weeks {
            writeln!(
                out,
                "  Week of {} - {}   Reg: {}  OT: {}",
                app::timezone::format_us_date(week.week_start),
                app::timezone::format_us_date(week.week_end()),
                format.format(week.regular_hours),
                format.format(week.overtime_hours),
            )?;
            for day in &week.days {
                let label = if day.day_of_week.is_empty() {
                    day.date.format("%A").to_string()
                } else {
                    day.day_of_week.clone()
                };
                writeln!(
                    out,
                    "    {:<10} {}  {} - {}  {} hrs",
                    label,
                    app::timezone::format_us_date(day.date),
                    day.time_in,
                    day.time_out,
                    format.format(day.total_hours),
                )?;
            }
        }
    }

    let diagnostics = &result.diagnostics;
    if diagnostics.warning_count() > 0 {
        writeln!(out, "\n{} record(s) need attention:", diagnostics.warning_count())?;
        for skipped in &diagnostics.skipped {
            writeln!(
                out,
                "  record {}: {} ({})",
                skipped.index + 1,
                skipped.reason.describe(),
                skipped.name.as_deref().unwrap_or("no name")
            )?;
        }
        if diagnostics.unparseable_clock_out > 0 {
            writeln!(
                out,
                "  {} clock-out time(s) could not be read and count as 0 hours",
                diagnostics.unparseable_clock_out
            )?;
        }
    }
    Ok(())
}

fn write_files(cli: &Cli, session: &DashboardSession) -> anyhow::Result<()> {
    let Some(result) = session.result() else {
        return Ok(());
    };

    if let Some(target) = &cli.html {
        let path = target
            .clone()
            .unwrap_or_else(|| PathBuf::from(export::generate_export_filename("timecards", "html")));
        let html = export::render_html(result, session.range(), session.time_format());
        std::fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Exported HTML report: {}", path.display());
    }

    if let Some(target) = &cli.xlsx {
        let path = target
            .clone()
            .unwrap_or_else(|| PathBuf::from(export::generate_export_filename("timecards", "xlsx")));
        export::export_to_excel(result, session.time_format(), &path)?;
        tracing::info!("Exported Excel report: {}", path.display());
    }

    Ok(())
}
