//! Trailing-week aggregation over a child's event log.
//!
//! [`aggregate`] holds the pure reductions, [`analyzer`] wires them to an
//! [`EventStore`](crate::store::EventStore) snapshot.

pub mod aggregate;
pub mod analyzer;
pub mod types;
pub mod utility;

pub use analyzer::{change_averages, feed_averages, sleep_averages, weekly_report_at};
pub use types::{ChangeAverages, FeedAverages, SleepAverages, WeeklyReport};
