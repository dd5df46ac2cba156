use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{NaiveDateTime, NaiveTime, Weekday};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    daemon::storage::activity_store::{retention_cutoff, ActivityStore},
    report::DailyReportGenerator,
    utils::{
        clock::Clock,
        time::{next_daily_fire, next_weekly_fire},
    },
};

pub const SWEEP_WEEKDAY: Weekday = Weekday::Sun;
pub const SWEEP_TIME: NaiveTime = match NaiveTime::from_hms_opt(3, 0, 0) {
    Some(v) => v,
    None => NaiveTime::MIN,
};

/// Wall clock is re-read on every tick, so sleeping machines catch up on wake.
const TICK: Duration = Duration::from_secs(30);

/// Fires the daily report and the weekly retention sweep.
pub struct Scheduler {
    report: Arc<DailyReportGenerator>,
    store: Arc<dyn ActivityStore>,
    report_time: NaiveTime,
    retention_days: u32,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        report: Arc<DailyReportGenerator>,
        store: Arc<dyn ActivityStore>,
        report_time: NaiveTime,
        retention_days: u32,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            report,
            store,
            report_time,
            retention_days,
            shutdown,
            clock,
        }
    }

    fn sweep(&self, now: NaiveDateTime) {
        let cutoff = retention_cutoff(now.date(), self.retention_days);
        match self.store.delete_older_than(cutoff) {
            Ok(report) => info!(
                "Retention sweep removed {} segments and {} snapshots before {cutoff}",
                report.segments, report.snapshots
            ),
            Err(e) => error!("Retention sweep failed: {e:?}"),
        }
    }

    pub async fn run(self) -> Result<()> {
        let now = self.clock.local_now();
        let mut next_report = next_daily_fire(now, self.report_time);
        let mut next_sweep = next_weekly_fire(now, SWEEP_WEEKDAY, SWEEP_TIME);
        info!("Next report at {next_report}, next retention sweep at {next_sweep}");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep(TICK) => ()
            }

            let now = self.clock.local_now();
            if now >= next_report {
                self.report.run_scheduled().await;
                next_report = next_daily_fire(self.clock.local_now(), self.report_time);
                info!("Next report at {next_report}");
            }
            if now >= next_sweep {
                self.sweep(now);
                next_sweep = next_weekly_fire(now, SWEEP_WEEKDAY, SWEEP_TIME);
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }
}
