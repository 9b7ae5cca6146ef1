use abstutil::Counter;
use chrono::{DateTime, Utc};

use itinerary::TransportKind;

use crate::{Segment, Selection, VisitRecord};

/// Like "Mar 19 2023"
pub fn format_date(t: DateTime<Utc>) -> String {
    t.format("%b %-d %Y").to_string()
}

impl Segment {
    pub fn describe(&self) -> String {
        format!(
            "{}: {} → {}\n{} · {}",
            self.trip,
            self.from_label,
            self.to_label,
            format_date(self.start_time),
            self.kind.label()
        )
    }
}

impl VisitRecord {
    pub fn describe(&self) -> String {
        let label = if self.label.is_empty() {
            "Stop"
        } else {
            self.label.as_str()
        };
        let trips: Vec<&str> = self.trips.iter().map(|t| t.as_str()).collect();
        format!(
            "{label} · {} visit(s)\n{}",
            self.visits,
            trips.join(", ")
        )
    }

    /// Unzoomed radius for a marker; grows slowly with repeat visits
    pub fn marker_radius(&self) -> f64 {
        3.0 + (self.visits as f64).sqrt() * 3.0
    }
}

impl<'a> Selection<'a> {
    /// Like "Mar 19 2023 → Apr 2 2023 · 16 segments · 12 stops". Empty if nothing is selected.
    pub fn hero_summary(&self) -> String {
        match self.extent {
            Some(extent) => format!(
                "{} → {} · {} segments · {} stops",
                format_date(extent.start),
                format_date(extent.end),
                self.segments.len(),
                self.visits.len()
            ),
            None => String::new(),
        }
    }

    pub fn kind_counts(&self) -> Counter<TransportKind> {
        let mut cnt = Counter::new();
        for segment in &self.segments {
            cnt.inc(segment.kind);
        }
        cnt
    }
}
