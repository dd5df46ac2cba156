use std::{mem, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    daemon::{processing::SegmentSink, storage::entities::WindowSegment},
    utils::clock::Clock,
    window_api::{ActiveWindowData, WindowManager},
};

enum TrackingState {
    Idle,
    Tracking {
        window: ActiveWindowData,
        start: NaiveDateTime,
    },
}

/// Polls the focused window and turns focus changes into [WindowSegment]s.
///
/// A window is identified by its process and OS handle, so a browser switching tabs stays one
/// segment. Segments shorter than the configured minimum are dropped.
pub struct WindowSampler {
    manager: Box<dyn WindowManager>,
    sink: Arc<dyn SegmentSink>,
    shutdown: CancellationToken,
    interval: Duration,
    min_duration_secs: i64,
    clock: Box<dyn Clock>,
    state: TrackingState,
}

impl WindowSampler {
    pub fn new(
        manager: Box<dyn WindowManager>,
        sink: Arc<dyn SegmentSink>,
        shutdown: CancellationToken,
        interval: Duration,
        min_duration_secs: i64,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            manager,
            sink,
            shutdown,
            interval,
            min_duration_secs,
            clock,
            state: TrackingState::Idle,
        }
    }

    /// Reads the focused window once. Read failures leave the current state untouched.
    pub fn poll(&mut self) {
        let window = match self.manager.get_active_window_data() {
            Ok(window) => window,
            Err(e) => {
                debug!("Skipping window poll: {e:?}");
                return;
            }
        };

        if let TrackingState::Tracking { window: current, .. } = &self.state {
            if current.same_window(&window) {
                return;
            }
        }

        let now = self.clock.local_now();
        self.finish_at(now);
        debug!("Now tracking {} ({})", window.process_name, window.window_title);
        self.state = TrackingState::Tracking { window, start: now };
    }

    /// Finalizes the tracked window, if any, and goes back to idle.
    pub fn finish(&mut self) {
        let now = self.clock.local_now();
        self.finish_at(now);
    }

    fn finish_at(&mut self, end: NaiveDateTime) {
        let TrackingState::Tracking { window, start } =
            mem::replace(&mut self.state, TrackingState::Idle)
        else {
            return;
        };

        let duration_seconds = (end - start).num_seconds();
        if duration_seconds < self.min_duration_secs {
            debug!(
                "Dropping {} after {duration_seconds}s, below {}s",
                window.process_name, self.min_duration_secs
            );
            return;
        }

        self.sink.segment_finished(WindowSegment {
            window_title: window.window_title,
            process_name: window.process_name,
            start,
            end,
            duration_seconds,
        });
    }

    /// Executes the sampling loop until shutdown, then flushes the tracked window once.
    pub async fn run(mut self) -> Result<()> {
        info!("Window sampler started with interval {:?}", self.interval);
        let mut collection_point = self.clock.instant();
        loop {
            collection_point += self.interval;

            self.poll();

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep_until(collection_point) => ()
            }
        }

        self.finish();
        info!("Window sampler stopped");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use chrono::{NaiveDate, NaiveDateTime};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{processing::SegmentSink, storage::entities::WindowSegment},
        utils::{clock::test_clock::ManualClock, logging::TEST_LOGGING},
        window_api::{ActiveWindowData, MockWindowManager},
    };

    use super::WindowSampler;

    #[derive(Default)]
    pub struct CollectingSink {
        pub segments: Mutex<Vec<WindowSegment>>,
    }

    impl CollectingSink {
        pub fn taken(&self) -> Vec<WindowSegment> {
            self.segments.lock().unwrap().clone()
        }
    }

    impl SegmentSink for CollectingSink {
        fn segment_finished(&self, segment: WindowSegment) {
            self.segments.lock().unwrap().push(segment);
        }
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn window(process: &str, id: u64, title: &str) -> ActiveWindowData {
        ActiveWindowData {
            window_title: title.into(),
            process_name: process.into(),
            window_id: id,
        }
    }

    /// Manager answering with `script` in order, then failing.
    fn scripted(script: Vec<Result<ActiveWindowData>>) -> MockWindowManager {
        let mut manager = MockWindowManager::new();
        let mut script = script.into_iter();
        manager
            .expect_get_active_window_data()
            .returning(move || script.next().unwrap_or_else(|| Err(anyhow!("script ended"))));
        manager
    }

    fn sampler(
        manager: MockWindowManager,
        clock: &ManualClock,
        sink: &Arc<CollectingSink>,
    ) -> WindowSampler {
        WindowSampler::new(
            Box::new(manager),
            sink.clone(),
            CancellationToken::new(),
            Duration::from_secs(5),
            3,
            Box::new(clock.clone()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn short_windows_are_dropped() {
        *TEST_LOGGING;
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = sampler(
            scripted(vec![
                Ok(window("code", 1, "main.rs")),
                Ok(window("firefox", 2, "docs")),
                Ok(window("code", 1, "main.rs")),
            ]),
            &clock,
            &sink,
        );

        sampler.poll();
        clock.advance(2);
        sampler.poll();
        clock.advance(10);
        sampler.poll();

        let segments = sink.taken();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].process_name, "firefox");
        assert_eq!(segments[0].duration_seconds, 10);
        assert_eq!(segments[0].start, start() + chrono::Duration::seconds(2));
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_duration_is_kept() {
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = sampler(
            scripted(vec![
                Ok(window("code", 1, "main.rs")),
                Ok(window("firefox", 2, "docs")),
            ]),
            &clock,
            &sink,
        );

        sampler.poll();
        clock.advance(3);
        sampler.poll();

        let segments = sink.taken();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration_seconds, 3);
        assert_eq!(segments[0].end - segments[0].start, chrono::Duration::seconds(3));
    }

    #[tokio::test(start_paused = true)]
    async fn title_change_within_window_continues_segment() {
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = sampler(
            scripted(vec![
                Ok(window("firefox", 7, "Tab one")),
                Ok(window("firefox", 7, "Tab two")),
            ]),
            &clock,
            &sink,
        );

        sampler.poll();
        clock.advance(5);
        sampler.poll();
        clock.advance(5);
        sampler.finish();

        let segments = sink.taken();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].window_title, "Tab one");
        assert_eq!(segments[0].duration_seconds, 10);

        // Finishing twice emits nothing new.
        sampler.finish();
        assert_eq!(sink.taken().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_keep_tracking() {
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = sampler(
            scripted(vec![
                Ok(window("code", 1, "main.rs")),
                Err(anyhow!("no foreground window")),
                Ok(window("code", 1, "main.rs")),
            ]),
            &clock,
            &sink,
        );

        sampler.poll();
        clock.advance(4);
        sampler.poll();
        clock.advance(4);
        sampler.poll();
        assert!(sink.taken().is_empty());

        sampler.finish();
        let segments = sink.taken();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration_seconds, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn same_process_new_handle_is_a_new_segment() {
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = sampler(
            scripted(vec![
                Ok(window("code", 1, "a.rs")),
                Ok(window("code", 2, "a.rs")),
            ]),
            &clock,
            &sink,
        );

        sampler.poll();
        clock.advance(6);
        sampler.poll();
        clock.advance(6);
        sampler.finish();

        assert_eq!(sink.taken().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_on_shutdown() -> Result<()> {
        *TEST_LOGGING;
        let clock = ManualClock::starting_at(start());
        let sink = Arc::new(CollectingSink::default());
        let polls = Arc::new(AtomicUsize::new(0));

        let mut manager = MockWindowManager::new();
        let counter = polls.clone();
        manager.expect_get_active_window_data().returning(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Ok(window("code", 1, "main.rs"))
            } else {
                Ok(window("steam", 2, "Steam"))
            }
        });

        let shutdown = CancellationToken::new();
        let sampler = WindowSampler::new(
            Box::new(manager),
            sink.clone(),
            shutdown.clone(),
            Duration::from_secs(5),
            3,
            Box::new(clock.clone()),
        );

        let handle = tokio::spawn(sampler.run());
        tokio::time::sleep(Duration::from_secs(32)).await;
        shutdown.cancel();
        handle.await??;

        let segments = sink.taken();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].process_name, "code");
        assert_eq!(segments[0].duration_seconds, 15);
        assert_eq!(segments[1].process_name, "steam");
        assert_eq!(segments[1].duration_seconds, 17);
        assert!(polls.load(Ordering::SeqCst) >= 7);
        Ok(())
    }
}
