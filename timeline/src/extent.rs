use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::Segment;

/// The smallest window holding every start and end time of some segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeExtent {
    pub start: DateTime<Utc>,
    /// Never before start
    pub end: DateTime<Utc>,
}

impl TimeExtent {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Maps a slider percentage in [0, 100] onto the window. Values outside are clamped, and
    /// garbage means the start.
    pub fn instant_at(&self, percent: f64) -> DateTime<Utc> {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        // The ends are exact, whatever precision the instants have
        if percent >= 100.0 {
            return self.end;
        }
        if percent <= 0.0 {
            return self.start;
        }
        // Windows longer than about 292 years only get millisecond precision
        let offset = match self.duration().num_nanoseconds() {
            Some(ns) => Duration::nanoseconds((ns as f64 * percent / 100.0).round() as i64),
            None => {
                let ms = self.duration().num_milliseconds() as f64;
                Duration::milliseconds((ms * percent / 100.0).round() as i64)
            }
        };
        (self.start + offset).min(self.end)
    }
}

/// None for no segments.
pub fn compute_time_extent<'a, I: IntoIterator<Item = &'a Segment>>(
    segments: I,
) -> Option<TimeExtent> {
    let mut iter = segments.into_iter();
    let first = iter.next()?;
    let seed = TimeExtent {
        start: first.start_time,
        end: first.end_time,
    };
    Some(iter.fold(seed, |extent, segment| TimeExtent {
        start: extent.start.min(segment.start_time),
        end: extent.end.max(segment.end_time),
    }))
}
