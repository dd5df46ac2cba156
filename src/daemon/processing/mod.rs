//! Everything between the samplers and the store. Samplers hand finished events to a sink
//! synchronously; [recorder::Recorder] is the sink used by the daemon.

use crate::daemon::storage::entities::{InputSnapshot, WindowSegment};

pub mod privacy;
pub mod recorder;

/// Receives every window segment that passed the duration filter, exactly once.
pub trait SegmentSink: Send + Sync {
    fn segment_finished(&self, segment: WindowSegment);
}

/// Receives one snapshot per drained input interval.
pub trait SnapshotSink: Send + Sync {
    fn snapshot_ready(&self, snapshot: InputSnapshot);
}
