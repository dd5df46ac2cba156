//! Plain text rendering of reports and statistics for the terminal.

use crate::{
    analysis::AnalysisSource,
    daemon::storage::entities::{Category, DailySummary},
    report::{DayStats, ReportOutcome},
    utils::time::format_minutes,
};

pub fn render_day_stats(stats: &DayStats) -> String {
    let mut lines = vec![format!("📊 Stats for {}:", stats.date)];
    if stats.minutes.total() == 0 {
        lines.push("  Nothing recorded yet".into());
        return lines.join("\n");
    }

    for category in Category::ALL {
        let minutes = stats.minutes.get(category);
        if minutes > 0 {
            lines.push(format!(
                "  {} {}: {}",
                category.emoji(),
                category.display_name(),
                format_minutes(minutes)
            ));
        }
    }
    lines.push(format!("  📈 Activity: {:.1}", stats.avg_activity_score));
    lines.push(format!(
        "  💼 Productivity: {}%",
        stats.productivity.productivity_ratio
    ));

    if !stats.top_processes.is_empty() {
        lines.push("  Top processes:".into());
        for process in &stats.top_processes {
            lines.push(format!(
                "    {}\t{}\t{}",
                format_minutes(process.minutes),
                process.category.display_name(),
                process.process_name
            ));
        }
    }
    lines.join("\n")
}

pub fn render_report(outcome: &ReportOutcome) -> String {
    match outcome {
        ReportOutcome::NoData { date } => format!("  ⚠️ No activity recorded for {date}"),
        ReportOutcome::Completed { summary, source } => {
            let source = match source {
                AnalysisSource::Remote => "AI",
                AnalysisSource::Local => "local rules",
            };
            [
                format!("  ✓ Analysis complete ({source})"),
                format!("    Active: {}", format_minutes(summary.total_active_minutes)),
                format!("    Mood: {}/10", score(summary.mood_score)),
                format!("    Stress: {}/10", score(summary.stress_score)),
                format!("    Summary: {}", summary.summary_text.as_deref().unwrap_or("-")),
                "    Caption:".into(),
                indent(summary.social_caption.as_deref().unwrap_or("-"), "    "),
            ]
            .join("\n")
        }
    }
}

pub fn render_history(summaries: &[DailySummary]) -> String {
    if summaries.is_empty() {
        return "No reports yet".into();
    }
    summaries
        .iter()
        .map(|v| {
            format!(
                "{}\t{}\tmood {}\tstress {}\t{}",
                v.date,
                format_minutes(v.total_active_minutes),
                score(v.mood_score),
                score(v.stress_score),
                v.summary_text.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn score(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1}"))
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
