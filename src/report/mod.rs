//! Daily report pipeline: aggregate a day from the store, analyze it, persist the summary and
//! present it on the desktop.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::{error, info, instrument, warn};

use crate::{
    analysis::{
        categorizer::{analyze_productivity, ProductivityAnalysis},
        AnalysisInput, AnalysisSource, DailyAnalyzer,
    },
    config::NotificationConfig,
    daemon::storage::{
        activity_store::ActivityStore,
        entities::{CategoryMinutes, DailySummary, ProcessUsage},
    },
    notify::{present_report, Notifier, ReportNotice},
    utils::clock::Clock,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Nothing was recorded for the date. Nothing is written and nobody is notified.
    NoData { date: NaiveDate },
    Completed {
        summary: DailySummary,
        source: AnalysisSource,
    },
}

pub struct DailyReportGenerator {
    store: Arc<dyn ActivityStore>,
    analyzer: DailyAnalyzer,
    notifier: Option<Arc<dyn Notifier>>,
    notifications: NotificationConfig,
    clock: Box<dyn Clock>,
}

impl DailyReportGenerator {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        analyzer: DailyAnalyzer,
        notifier: Option<Arc<dyn Notifier>>,
        notifications: NotificationConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            store,
            analyzer,
            notifier,
            notifications,
            clock,
        }
    }

    /// Yesterday, relative to the local clock.
    pub fn default_date(&self) -> NaiveDate {
        let today = self.clock.local_now().date();
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    }

    /// Builds the report for `date`, or yesterday when it's not given.
    #[instrument(skip(self))]
    pub async fn generate(&self, date: Option<NaiveDate>) -> Result<ReportOutcome> {
        let date = date.unwrap_or_else(|| self.default_date());

        let Some(minutes) = self.store.category_minutes(date)? else {
            info!("No activity recorded for {date}");
            return Ok(ReportOutcome::NoData { date });
        };
        let avg_activity_score = self.store.average_activity_score(date)?;

        let input = AnalysisInput::new(minutes, avg_activity_score);
        let result = self.analyzer.analyze(&input).await;
        info!("Analyzed {date} using {:?} rules", result.source);

        let summary = DailySummary {
            date,
            minutes,
            total_active_minutes: minutes.total(),
            avg_activity_score,
            mood_score: Some(result.mood_score),
            stress_score: Some(result.stress_score),
            summary_text: Some(result.summary.clone()),
            social_caption: Some(result.caption.clone()),
            created_at: self.clock.local_now(),
        };
        self.store.upsert_daily_summary(&summary)?;

        if let Some(notifier) = &self.notifier {
            let notice = ReportNotice {
                caption: &result.caption,
                mood_score: result.mood_score,
                stress_score: result.stress_score,
                summary: &result.summary,
            };
            if let Err(e) = present_report(notifier.as_ref(), &self.notifications, &notice) {
                warn!("Failed to present report for {date}: {e:?}");
            }
        }

        Ok(ReportOutcome::Completed {
            summary,
            source: result.source,
        })
    }

    /// Entry point for the scheduler. Errors end the run, the next one starts fresh.
    pub async fn run_scheduled(&self) {
        match self.generate(None).await {
            Ok(ReportOutcome::NoData { date }) => info!("Skipped report for {date}, no data"),
            Ok(ReportOutcome::Completed { summary, .. }) => {
                info!("Daily report for {} saved", summary.date)
            }
            Err(e) => error!("Daily report failed: {e:?}"),
        }
    }
}

/// Live view of a single day, as shown by `dayreview today`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayStats {
    pub date: NaiveDate,
    pub minutes: CategoryMinutes,
    pub avg_activity_score: f64,
    pub productivity: ProductivityAnalysis,
    pub top_processes: Vec<ProcessUsage>,
}

pub fn day_stats(store: &dyn ActivityStore, date: NaiveDate, top: usize) -> Result<DayStats> {
    let minutes = store.category_minutes(date)?.unwrap_or_default();
    Ok(DayStats {
        date,
        minutes,
        avg_activity_score: store.average_activity_score(date)?,
        productivity: analyze_productivity(&minutes),
        top_processes: store.top_processes(date, top)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        analysis::{local, AnalysisSource, DailyAnalyzer},
        config::NotificationConfig,
        daemon::storage::{
            activity_store::{ActivityStore, MockActivityStore, SqliteStore},
            entities::{ActivitySegment, Category, InputSnapshot},
        },
        notify::{MockNotifier, Notifier},
        utils::clock::test_clock::ManualClock,
    };

    use super::{day_stats, DailyReportGenerator, ReportOutcome};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, 0, 0).unwrap()
    }

    fn store_with_day(date: NaiveDate) -> Result<Arc<SqliteStore>> {
        let store = SqliteStore::open_in_memory()?;
        for (process, category, hour, minutes) in [
            ("code", Category::Work, 9, 420),
            ("steam", Category::Game, 17, 60),
        ] {
            store.insert_segment(&ActivitySegment {
                window_title: format!("{process} window"),
                process_name: process.into(),
                category,
                start: at(date, hour),
                end: at(date, hour) + chrono::Duration::minutes(minutes),
                duration_seconds: minutes * 60,
            })?;
        }
        store.insert_snapshot(&InputSnapshot {
            timestamp: at(date, 10),
            keyboard_count: 40,
            mouse_count: 20,
        })?;
        Ok(Arc::new(store))
    }

    fn generator(
        store: Arc<dyn ActivityStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> DailyReportGenerator {
        DailyReportGenerator::new(
            store,
            DailyAnalyzer::local_only(StdRng::seed_from_u64(5)),
            notifier,
            NotificationConfig::default(),
            Box::new(ManualClock::starting_at(at(day().succ_opt().unwrap(), 0))),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn report_defaults_to_yesterday_and_notifies() -> Result<()> {
        let store = store_with_day(day())?;

        let mut notifier = MockNotifier::new();
        notifier.expect_copy_to_clipboard().times(1).returning(|_| Ok(()));
        notifier
            .expect_show_message()
            .withf(|_, body, _| body.contains(local::SUMMARY_LONG_WORK))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let generator = generator(store.clone(), Some(Arc::new(notifier)));
        let outcome = generator.generate(None).await?;

        let ReportOutcome::Completed { summary, source } = outcome else {
            panic!("expected a report, got {outcome:?}");
        };
        assert_eq!(source, AnalysisSource::Local);
        assert_eq!(summary.date, day());
        assert_eq!(summary.minutes.work, 420);
        assert_eq!(summary.total_active_minutes, 480);
        assert_eq!(summary.avg_activity_score, 50.);
        assert_eq!(summary.summary_text.as_deref(), Some(local::SUMMARY_LONG_WORK));

        assert_eq!(store.daily_summary(day())?, Some(summary));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn empty_day_writes_nothing() -> Result<()> {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        let mut notifier = MockNotifier::new();
        notifier.expect_show_message().never();
        notifier.expect_copy_to_clipboard().never();

        let generator = generator(store.clone(), Some(Arc::new(notifier)));
        assert_eq!(
            generator.generate(Some(day())).await?,
            ReportOutcome::NoData { date: day() }
        );
        assert!(store.recent_summaries(10)?.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rerunning_a_day_keeps_one_summary() -> Result<()> {
        let store = store_with_day(day())?;
        let generator = generator(store.clone(), None);

        generator.generate(Some(day())).await?;
        generator.generate(Some(day())).await?;

        assert_eq!(store.recent_summaries(10)?.len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn notifier_failure_keeps_the_summary() -> Result<()> {
        let store = store_with_day(day())?;
        let mut notifier = MockNotifier::new();
        notifier.expect_copy_to_clipboard().returning(|_| Ok(()));
        notifier
            .expect_show_message()
            .returning(|_, _, _| Err(anyhow!("no notification daemon")));

        let generator = generator(store.clone(), Some(Arc::new(notifier)));
        generator.generate(Some(day())).await?;
        assert!(store.daily_summary(day())?.is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn store_errors_are_returned() {
        let mut store = MockActivityStore::new();
        store
            .expect_category_minutes()
            .returning(|_| Err(anyhow!("database is locked")));
        store.expect_upsert_daily_summary().never();

        let generator = generator(Arc::new(store), None);
        assert!(generator.generate(Some(day())).await.is_err());
        // The scheduled entry point swallows the error.
        generator.run_scheduled().await;
    }

    #[test]
    fn day_stats_for_empty_day_are_neutral() -> Result<()> {
        let store = SqliteStore::open_in_memory()?;
        let stats = day_stats(&store, day(), 5)?;
        assert_eq!(stats.minutes.total(), 0);
        assert_eq!(stats.productivity.balance_score, 50.);
        assert!(stats.top_processes.is_empty());
        Ok(())
    }

    #[test]
    fn day_stats_include_top_processes() -> Result<()> {
        let store = store_with_day(day())?;
        let stats = day_stats(store.as_ref(), day(), 1)?;
        assert_eq!(stats.top_processes.len(), 1);
        assert_eq!(stats.top_processes[0].process_name, "code");
        assert_eq!(stats.productivity.productivity_ratio, 87.5);
        Ok(())
    }
}
