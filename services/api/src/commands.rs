use crate::infra::parse_date;
use chrono::{Local, NaiveDate};
use clap::Args;
use roster_readiness::config::AppConfig;
use roster_readiness::error::AppError;
use roster_readiness::readiness::{
    ComprehensiveTable, EventCategory, EventFilter, EventId, ReadinessReport,
    ReadinessReportSummary, RosterSnapshot, RotationCalendar,
};
use roster_readiness::telemetry;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Roster snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Restrict compliance figures to one event category
    #[arg(long)]
    pub(crate) category: Option<String>,
    /// Print the full summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TableArgs {
    /// Roster snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Destination file; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CopyForwardArgs {
    /// Roster snapshot (JSON)
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Event whose expected soldiers should be refilled
    #[arg(long)]
    pub(crate) event: String,
    /// Days back to the source event (defaults to READINESS_COPY_FORWARD_DAYS)
    #[arg(long)]
    pub(crate) days: Option<i64>,
    /// Where to write the updated snapshot; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RotationArgs {
    /// Date to resolve (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn load_snapshot(path: &Path) -> Result<RosterSnapshot, AppError> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(io::BufReader::new(file))?;
    Ok(snapshot)
}

pub(crate) fn run_readiness_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        snapshot,
        today,
        category,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let snapshot = load_snapshot(&snapshot)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let mut settings = config.readiness.report_settings();
    if let Some(category) = category {
        settings.filter = EventFilter {
            category: Some(EventCategory(category)),
        };
    }

    let report = ReadinessReport::build(&snapshot, today, &settings)?;
    let summary = report.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        render_readiness_report(&summary);
    }
    Ok(())
}

pub(crate) fn run_table_export(args: TableArgs) -> Result<(), AppError> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let book = snapshot.attendance_book()?;
    let table = ComprehensiveTable::build(&snapshot.soldiers, &snapshot.events, &book);

    match args.output {
        Some(path) => table.write_csv(File::create(path)?)?,
        None => table.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) fn run_copy_forward(args: CopyForwardArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mut snapshot = load_snapshot(&args.snapshot)?;
    let event = EventId(args.event);
    let days = args.days.unwrap_or(config.readiness.copy_forward_days);

    match snapshot.copy_forward_expected(&event, days)? {
        Some(source) => info!(%event, %source, days, "copied expected soldiers forward"),
        None => warn!(%event, days, "no same-category event to copy from"),
    }

    match args.output {
        Some(path) => serde_json::to_writer_pretty(File::create(path)?, &snapshot)?,
        None => serde_json::to_writer_pretty(io::stdout().lock(), &snapshot)?,
    }
    Ok(())
}

pub(crate) fn run_rotation(args: RotationArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let calendar = RotationCalendar::new(config.readiness.rotation_settings());
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let rotation = calendar.active_groups(date);

    println!(
        "{}: {} (ISO week {} of {})",
        rotation.date, rotation.week_label, rotation.week_number, rotation.iso_year
    );
    for group in rotation.groups {
        println!(
            "- {} reports on {}",
            group.label(),
            calendar.entry_weekday(group)
        );
    }
    Ok(())
}

pub(crate) fn render_readiness_report(summary: &ReadinessReportSummary) {
    println!("Readiness report as of {}", summary.as_of);
    println!(
        "{} (ISO week {}): {}",
        summary.rotation.week_label,
        summary.rotation.week_number,
        summary.rotation.active_groups.join(", ")
    );
    if !summary.rotation.on_rotation.is_empty() {
        let names: Vec<&str> = summary
            .rotation
            .on_rotation
            .iter()
            .map(|entry| entry.full_name.as_str())
            .collect();
        println!("On rotation: {}", names.join(", "));
    }

    let compliance = &summary.compliance;
    println!(
        "\nAttendance: {:.1}% over {} events ({} attended, {} absent, {} excused, {} not updated)",
        compliance.percentage,
        compliance.events_counted,
        compliance.totals.attended,
        compliance.totals.absent,
        compliance.totals.non_countable_absent,
        compliance.totals.not_updated
    );
    for soldier in &compliance.soldiers {
        println!("- {}: {:.1}%", soldier.full_name, soldier.percentage);
    }

    if !compliance.absences.is_empty() {
        println!("\nAbsences by reason");
        for reason in &compliance.absences {
            let counted = if reason.countable { "counted" } else { "excused" };
            println!("- {}: {} ({counted})", reason.label, reason.count);
        }
    }

    println!("\nMonthly trend");
    for point in &summary.trend {
        println!(
            "- {}: {:.1}% ({} events)",
            point.month, point.percentage, point.events
        );
    }

    for submissions in &summary.submissions {
        println!(
            "\n{}: {} submitted, {} missing, {} duplicates, {} unresolved names",
            submissions.kind,
            submissions.submitted,
            submissions.missing.len(),
            submissions.duplicates,
            submissions.unmatched + submissions.ambiguous
        );
        for missing in &submissions.missing {
            println!("- missing: {}", missing.full_name);
        }
    }

    println!("\nSafety tiers");
    for tier in &summary.safety_tiers {
        println!("- {}: {}", tier.status_label, tier.soldiers);
    }
    let follow_ups: Vec<_> = summary
        .standings
        .iter()
        .filter(|standing| standing.required_action.is_some())
        .collect();
    if follow_ups.is_empty() {
        println!("Safety follow-ups: none");
    } else {
        println!("Safety follow-ups");
        for standing in follow_ups {
            let held = if standing.held_by_suspension {
                " (held pending review)"
            } else {
                ""
            };
            println!(
                "- {} [{}]: {}{held}",
                standing.full_name,
                standing.status_label,
                standing.required_action.unwrap_or_default()
            );
        }
    }

    if summary.findings.is_empty() {
        println!("\nData quality: no findings");
    } else {
        println!("\nData quality");
        for finding in &summary.findings {
            println!("- {}", finding.description);
        }
    }
}
