use std::sync::Arc;

use tracing::{debug, error};

use crate::{
    analysis::categorizer::Categorizer,
    daemon::storage::{
        activity_store::ActivityStore,
        entities::{ActivitySegment, InputSnapshot, WindowSegment},
    },
};

use super::{privacy::PrivacyFilter, SegmentSink, SnapshotSink};

/// Titles longer than this are cut before they are stored.
pub const MAX_TITLE_CHARS: usize = 200;

/// Categorizes, masks and persists sampler output. Store errors are logged and the event is
/// dropped, the samplers keep running.
pub struct Recorder {
    store: Arc<dyn ActivityStore>,
    categorizer: Categorizer,
    privacy: PrivacyFilter,
}

impl Recorder {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        categorizer: Categorizer,
        privacy: PrivacyFilter,
    ) -> Self {
        Self {
            store,
            categorizer,
            privacy,
        }
    }

    fn to_activity(&self, segment: WindowSegment) -> ActivitySegment {
        // Categorization sees the title before masking.
        let category = self
            .categorizer
            .categorize(&segment.process_name, &segment.window_title);
        let window_title = self
            .privacy
            .mask(&segment.window_title)
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();

        ActivitySegment {
            window_title,
            process_name: segment.process_name,
            category,
            start: segment.start,
            end: segment.end,
            duration_seconds: segment.duration_seconds,
        }
    }
}

impl SegmentSink for Recorder {
    fn segment_finished(&self, segment: WindowSegment) {
        let activity = self.to_activity(segment);
        match self.store.insert_segment(&activity) {
            Ok(()) => debug!(
                "Recorded {} for {}s as {}",
                activity.process_name, activity.duration_seconds, activity.category
            ),
            Err(e) => error!("Failed to record segment {activity:?}: {e:?}"),
        }
    }
}

impl SnapshotSink for Recorder {
    fn snapshot_ready(&self, snapshot: InputSnapshot) {
        if let Err(e) = self.store.insert_snapshot(&snapshot) {
            error!("Failed to record input snapshot {snapshot:?}: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::{
        analysis::categorizer::Categorizer,
        daemon::{
            processing::{privacy::PrivacyFilter, SegmentSink, SnapshotSink},
            storage::{
                activity_store::{ActivityStore, MockActivityStore, SqliteStore},
                entities::{InputSnapshot, WindowSegment},
            },
        },
    };

    use super::{Recorder, MAX_TITLE_CHARS};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn segment(process: &str, title: &str) -> WindowSegment {
        WindowSegment {
            window_title: title.into(),
            process_name: process.into(),
            start: at(9, 0),
            end: at(9, 30),
            duration_seconds: 1800,
        }
    }

    fn recorder(store: Arc<dyn ActivityStore>) -> Result<Recorder> {
        Ok(Recorder::new(
            store,
            Categorizer::new(),
            PrivacyFilter::new(&["password".into()])?,
        ))
    }

    #[test]
    fn segments_are_categorized_and_masked() -> Result<()> {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        let recorder = recorder(store.clone())?;

        recorder.segment_finished(segment("steam.exe", "Change password - Steam"));
        recorder.segment_finished(segment("calc.exe", "Calculator"));

        let minutes = store.category_minutes(at(0, 0).date())?.unwrap();
        assert_eq!(minutes.game, 30);
        assert_eq!(minutes.other, 30);

        let top = store.top_processes(at(0, 0).date(), 5)?;
        assert_eq!(top.len(), 2);
        Ok(())
    }

    #[test]
    fn masking_and_truncation_happen_before_storage() -> Result<()> {
        let mut store = MockActivityStore::new();
        store
            .expect_insert_segment()
            .withf(|v| {
                v.window_title.chars().count() == MAX_TITLE_CHARS
                    && v.window_title.starts_with("[private] ")
            })
            .times(1)
            .returning(|_| Ok(()));
        let recorder = recorder(Arc::new(store))?;

        let title = format!("Password {}", "é".repeat(400));
        recorder.segment_finished(segment("firefox", &title));
        Ok(())
    }

    #[test]
    fn store_errors_do_not_escape() -> Result<()> {
        let mut store = MockActivityStore::new();
        store
            .expect_insert_segment()
            .returning(|_| Err(anyhow!("disk full")));
        store
            .expect_insert_snapshot()
            .times(1)
            .returning(|_| Err(anyhow!("disk full")));
        let recorder = recorder(Arc::new(store))?;

        recorder.segment_finished(segment("code", "main.rs"));
        recorder.snapshot_ready(InputSnapshot {
            timestamp: at(10, 0),
            keyboard_count: 3,
            mouse_count: 1,
        });
        Ok(())
    }
}
