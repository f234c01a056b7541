//! # Clock
//!
//! Injectable source of the current instant and of the UTC offset used to bucket
//! completions into local calendar days.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of time for the progression facade.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the local calendar.
    fn offset(&self) -> FixedOffset;

    /// Local calendar day of `at`.
    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    /// Local calendar day of now.
    fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }
}

/// Wall clock. Uses the host offset unless one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the local calendar to a fixed offset.
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

/// Manually driven clock for tests and replays.
///
/// Clones share the same instant, so a handle kept by a test can move the time of a
/// facade that owns another clone.
#[derive(Debug, Clone)]
pub struct FixedClock {
    seconds: Arc<AtomicI64>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Clock frozen at `at`, with UTC calendar days.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self::with_offset(at, Utc.fix())
    }

    #[must_use]
    pub fn with_offset(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(at.timestamp())),
            offset,
        }
    }

    /// Jump to `at`. Sub-second precision is dropped.
    pub fn set(&self, at: DateTime<Utc>) {
        self.seconds.store(at.timestamp(), Ordering::SeqCst);
    }

    /// Move forward by whole days.
    pub fn advance_days(&self, days: i64) {
        self.seconds
            .fetch_add(Duration::days(days).num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
