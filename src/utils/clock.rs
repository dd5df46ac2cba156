use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. All activity is
/// bucketed by local calendar days, so the clock hands out local time.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, instant: tokio::time::Instant);

    /// Wall clock time without an offset. This is the form in which timestamps are persisted.
    fn local_now(&self) -> NaiveDateTime {
        self.time().naive_local()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
