use std::{fmt::Display, path::Path, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    analysis::DailyAnalyzer,
    config::AppConfig,
    daemon::storage::activity_store::SqliteStore,
    notify::{DesktopNotifier, Notifier},
    report::DailyReportGenerator,
    utils::{clock::DefaultClock, dir::database_path},
};

use super::{output, Args};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        help = "Day to report on. Examples are \"today\", \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
    #[arg(long, help = "Only print the report, don't show a notification or touch the clipboard")]
    quiet: bool,
}

/// Runs the report pipeline once in the foreground and prints the outcome.
pub async fn process_report_command(
    ReportCommand {
        date,
        date_style,
        quiet,
    }: ReportCommand,
    app_dir: &Path,
    config: &AppConfig,
) -> Result<()> {
    let date = parse_report_date(date.as_deref(), date_style, Local::now())?;

    let store = Arc::new(SqliteStore::open(&database_path(app_dir))?);
    let notifier = if quiet {
        None
    } else {
        Some(Arc::new(DesktopNotifier::new()) as Arc<dyn Notifier>)
    };
    let generator = DailyReportGenerator::new(
        store,
        DailyAnalyzer::from_config(&config.ai)?,
        notifier,
        config.notifications.clone(),
        Box::new(DefaultClock),
    );

    println!("📊 Generating the daily report for {date}...");
    let outcome = generator.generate(Some(date)).await?;
    println!("{}", output::render_report(&outcome));
    Ok(())
}

fn parse_report_date(
    expression: Option<&str>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<NaiveDate> {
    let Some(expression) = expression else {
        return Ok(now.date_naive());
    };
    match parse_date_string(expression, now, date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}
