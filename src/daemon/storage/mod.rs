//! Storage is organized through [activity_store::SqliteStore].
//! The basic idea is:
//!   - Raw data (window segments and input snapshots) is appended and purged after a retention
//!     window.
//!   - Daily summaries are keyed by local date, replaced as a whole and never purged.

pub mod activity_store;
pub mod entities;
