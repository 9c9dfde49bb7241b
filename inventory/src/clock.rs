use chrono::{DateTime, TimeDelta, Utc};
use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    static ref GLOBAL: CascadeClock = CascadeClock::new();
}

/// Hands out the timestamps cascades mark their nodes with.
///
/// Stamps are strictly increasing: if the wall clock didn't move past the
/// last stamp handed out, the next one is a nanosecond after it. Two
/// cascades started through the same clock never share a timestamp, so a
/// restore can't revive nodes of an unrelated delete.
#[derive(Debug, Default)]
pub struct CascadeClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl CascadeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock shared by the whole process.
    pub fn global() -> &'static CascadeClock {
        &GLOBAL
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.issue(Utc::now())
    }

    fn issue(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock();

        let stamp = match *last {
            Some(prev) if wall <= prev => prev + TimeDelta::nanoseconds(1),
            _ => wall,
        };
        *last = Some(stamp);

        stamp
    }
}
