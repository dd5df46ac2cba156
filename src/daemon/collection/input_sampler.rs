use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::Result;
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    daemon::{processing::SnapshotSink, storage::entities::InputSnapshot},
    input_api::InputEvent,
    utils::clock::Clock,
};

#[derive(Debug)]
struct CounterState {
    keyboard: u64,
    clicks: u64,
    moves: u64,
    accepting: bool,
}

/// Counters shared between the OS hook thread and the drain loop. Every access takes the same
/// lock, so an event lands in exactly one snapshot.
#[derive(Debug)]
pub struct InputCounters {
    state: Mutex<CounterState>,
}

impl Default for InputCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCounters {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CounterState {
                keyboard: 0,
                clicks: 0,
                moves: 0,
                accepting: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn record(&self, event: InputEvent) {
        let mut state = self.lock();
        if !state.accepting {
            return;
        }
        match event {
            InputEvent::KeyPress => state.keyboard += 1,
            InputEvent::MouseClick => state.clicks += 1,
            InputEvent::MouseMove => state.moves += 1,
        }
    }

    /// Events arriving after this are ignored.
    pub fn stop_accepting(&self) {
        self.lock().accepting = false;
    }

    /// Takes the current counts and resets them. Every `moves_per_unit` raw moves count as one
    /// mouse unit, leftover moves are dropped.
    pub fn drain(&self, timestamp: NaiveDateTime, moves_per_unit: u64) -> InputSnapshot {
        let mut state = self.lock();
        let snapshot = InputSnapshot {
            timestamp,
            keyboard_count: state.keyboard,
            mouse_count: state.clicks + state.moves / moves_per_unit.max(1),
        };
        state.keyboard = 0;
        state.clicks = 0;
        state.moves = 0;
        snapshot
    }
}

/// Periodically drains [InputCounters] into [InputSnapshot]s.
pub struct InputSampler {
    counters: Arc<InputCounters>,
    sink: Arc<dyn SnapshotSink>,
    shutdown: CancellationToken,
    interval: Duration,
    moves_per_unit: u64,
    clock: Box<dyn Clock>,
}

impl InputSampler {
    pub fn new(
        counters: Arc<InputCounters>,
        sink: Arc<dyn SnapshotSink>,
        shutdown: CancellationToken,
        interval: Duration,
        moves_per_unit: u64,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            counters,
            sink,
            shutdown,
            interval,
            moves_per_unit,
            clock,
        }
    }

    fn emit(&self) {
        let snapshot = self
            .counters
            .drain(self.clock.local_now(), self.moves_per_unit);
        debug!("Input snapshot {snapshot:?}");
        self.sink.snapshot_ready(snapshot);
    }

    /// Drains on every interval. On shutdown the partial interval is flushed once.
    pub async fn run(self) -> Result<()> {
        info!("Input sampler started with interval {:?}", self.interval);
        let mut drain_point = self.clock.instant();
        loop {
            drain_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep_until(drain_point) => self.emit(),
            }
        }

        self.counters.stop_accepting();
        self.emit();
        info!("Input sampler stopped");
        Ok(())
    }
}
