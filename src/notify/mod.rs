//! Desktop side of the daily report: a transient message, the caption on the clipboard and an
//! optional application launch.

mod desktop;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::NotificationConfig;

pub use desktop::DesktopNotifier;

pub const REPORT_TITLE: &str = "📊 Daily activity report";

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn show_message(&self, title: &str, body: &str, duration: Duration) -> Result<()>;

    fn copy_to_clipboard(&self, text: &str) -> Result<()>;

    /// Best effort. `name` is an executable or anything the desktop knows how to open.
    fn launch_application(&self, name: &str) -> Result<()>;
}

/// What the user gets to see about a finished report.
#[derive(Debug, Clone, Copy)]
pub struct ReportNotice<'a> {
    pub caption: &'a str,
    pub mood_score: f64,
    pub stress_score: f64,
    pub summary: &'a str,
}

/// One emoji per two points.
pub fn score_bar(score: f64, emoji: &str) -> String {
    emoji.repeat((score / 2.).max(0.) as usize)
}

pub fn render_report_body(notice: &ReportNotice, copied: bool) -> String {
    let copy_line = if copied {
        "✅ Caption copied to the clipboard"
    } else {
        "⚠️ Copying failed, please copy the caption manually"
    };
    format!(
        "Mood: {} ({:.1}/10)\nStress: {} ({:.1}/10)\n{}\n\n{copy_line}",
        score_bar(notice.mood_score, "😊"),
        notice.mood_score,
        score_bar(notice.stress_score, "😰"),
        notice.stress_score,
        notice.summary,
    )
}

/// Copies the caption, shows the scores and launches the configured application. Only a failure
/// to show the message is an error.
pub fn present_report(
    notifier: &dyn Notifier,
    config: &NotificationConfig,
    notice: &ReportNotice,
) -> Result<()> {
    if !config.enabled {
        info!("Notifications disabled, skipping report presentation");
        return Ok(());
    }

    let copied = notifier
        .copy_to_clipboard(notice.caption)
        .inspect_err(|e| warn!("Failed to copy caption: {e:?}"))
        .is_ok();

    notifier.show_message(
        REPORT_TITLE,
        &render_report_body(notice, copied),
        Duration::from_secs(config.display_secs),
    )?;

    if let Some(application) = &config.launch_after_report {
        if let Err(e) = notifier.launch_application(application) {
            warn!("Failed to launch {application}: {e:?}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use mockall::Sequence;

    use crate::config::NotificationConfig;

    use super::{
        present_report, render_report_body, score_bar, MockNotifier, ReportNotice, REPORT_TITLE,
    };

    fn notice() -> ReportNotice<'static> {
        ReportNotice {
            caption: "Fully recharged 🔋",
            mood_score: 7.,
            stress_score: 4.5,
            summary: "well-balanced day",
        }
    }

    #[test]
    fn bars_use_one_emoji_per_two_points() {
        assert_eq!(score_bar(7., "😊"), "😊😊😊");
        assert_eq!(score_bar(1., "😊"), "");
        assert_eq!(score_bar(10., "😰"), "😰😰😰😰😰");
    }

    #[test]
    fn body_lists_scores_and_copy_state() {
        let body = render_report_body(&notice(), true);
        assert_eq!(
            body,
            "Mood: 😊😊😊 (7.0/10)\nStress: 😰😰 (4.5/10)\nwell-balanced day\n\n✅ Caption copied to the clipboard"
        );
        assert!(render_report_body(&notice(), false).contains("⚠️"));
    }

    #[test]
    fn caption_is_copied_before_message_and_app_launch() -> Result<()> {
        let mut notifier = MockNotifier::new();
        let mut sequence = Sequence::new();
        notifier
            .expect_copy_to_clipboard()
            .withf(|text| text == "Fully recharged 🔋")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        notifier
            .expect_show_message()
            .withf(|title, body, duration| {
                title == REPORT_TITLE && body.contains("✅") && duration.as_secs() == 15
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(()));
        notifier
            .expect_launch_application()
            .withf(|name| name == "wechat")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(anyhow!("not installed")));

        let config = NotificationConfig {
            launch_after_report: Some("wechat".into()),
            ..Default::default()
        };
        present_report(&notifier, &config, &notice())
    }

    #[test]
    fn failed_copy_is_reported_in_message() -> Result<()> {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_copy_to_clipboard()
            .returning(|_| Err(anyhow!("no clipboard")));
        notifier
            .expect_show_message()
            .withf(|_, body, _| body.contains("⚠️"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        notifier.expect_launch_application().never();

        present_report(&notifier, &NotificationConfig::default(), &notice())
    }

    #[test]
    fn disabled_notifications_do_nothing() -> Result<()> {
        let mut notifier = MockNotifier::new();
        notifier.expect_copy_to_clipboard().never();
        notifier.expect_show_message().never();

        let config = NotificationConfig {
            enabled: false,
            ..Default::default()
        };
        present_report(&notifier, &config, &notice())
    }
}
