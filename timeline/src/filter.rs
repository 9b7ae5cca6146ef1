use std::fmt;

use chrono::{DateTime, Utc};
use geom::LonLat;
use serde::Serialize;

use itinerary::TripName;

use crate::{Segment, VisitRecord};

/// The value meaning "every trip" wherever a trip is picked by name
pub const ALL_TRIPS: &str = "all";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TripSelector {
    All,
    Trip(TripName),
}

impl TripSelector {
    /// None or the `ALL_TRIPS` sentinel mean every trip.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            None | Some(ALL_TRIPS) => TripSelector::All,
            Some(name) => TripSelector::Trip(TripName::new(name)),
        }
    }

    pub fn matches(&self, trip: &TripName) -> bool {
        match self {
            TripSelector::All => true,
            TripSelector::Trip(name) => name == trip,
        }
    }

    pub fn matches_visit(&self, visit: &VisitRecord) -> bool {
        match self {
            TripSelector::All => true,
            TripSelector::Trip(name) => visit.visited_by(name),
        }
    }
}

impl fmt::Display for TripSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TripSelector::All => write!(f, "{ALL_TRIPS}"),
            TripSelector::Trip(name) => write!(f, "{name}"),
        }
    }
}

/// A segment that's started, and how far along it is.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimedSegment<'a> {
    pub segment: &'a Segment,
    /// In [0, 1]
    pub progress: f64,
}

impl<'a> TimedSegment<'a> {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Where along the route the traveller is right now
    pub fn current_position(&self) -> LonLat {
        self.segment.position_at(self.progress)
    }
}

/// Everything that's happened by some point in time.
#[derive(Clone, Debug, Serialize)]
pub struct AsOf<'a> {
    /// None if there was no time window to pick from
    pub now: Option<DateTime<Utc>>,
    pub segments: Vec<TimedSegment<'a>>,
    pub visits: Vec<&'a VisitRecord>,
}

impl<'a> AsOf<'a> {
    pub fn empty() -> Self {
        Self {
            now: None,
            segments: Vec::new(),
            visits: Vec::new(),
        }
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &TimedSegment<'a>> {
        self.segments.iter().filter(|s| !s.is_complete())
    }
}

/// Keeps segments that have started by `now` and visits first made by `now`, restricted to the
/// selected trip.
pub fn filter_as_of<'a, S, V>(
    segments: S,
    visits: V,
    now: DateTime<Utc>,
    selector: &TripSelector,
) -> AsOf<'a>
where
    S: IntoIterator<Item = &'a Segment>,
    V: IntoIterator<Item = &'a VisitRecord>,
{
    let segments = segments
        .into_iter()
        .filter(|s| selector.matches(&s.trip))
        .filter_map(|segment| {
            segment
                .progress_at(now)
                .map(|progress| TimedSegment { segment, progress })
        })
        .collect();
    let visits = visits
        .into_iter()
        .filter(|v| selector.matches_visit(v))
        .filter(|v| now >= v.first_visited)
        .collect();
    AsOf {
        now: Some(now),
        segments,
        visits,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use itinerary::{HexColor, Leg, PartialPoint, TransportKind, Trip};

    use super::*;
    use crate::{build_segments, build_visit_counts};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, hour, 0, 0).unwrap()
    }

    fn trips() -> Vec<Trip> {
        let leg = |lat: f64, lon: f64, hour: u32, mins: Option<f64>| Leg {
            from_label: "here".to_string(),
            to_label: "there".to_string(),
            from: PartialPoint::default(),
            to: LonLat::new(lon, lat).into(),
            start: t(hour),
            duration_minutes: mins,
            kind: TransportKind::Train,
        };
        vec![
            Trip {
                name: TripName::new("north"),
                color: HexColor::new("#00f"),
                countries: Vec::new(),
                itinerary: vec![leg(10.0, 10.0, 1, Some(120.0)), leg(20.0, 10.0, 4, None)],
            },
            Trip {
                name: TripName::new("south"),
                color: HexColor::new("#f00"),
                countries: Vec::new(),
                itinerary: vec![leg(10.0, 10.0, 2, Some(60.0)), leg(-5.0, 10.0, 6, Some(60.0))],
            },
        ]
    }

    #[test]
    fn selector_from_name() {
        assert_eq!(TripSelector::from_name(None), TripSelector::All);
        assert_eq!(TripSelector::from_name(Some("all")), TripSelector::All);
        assert_eq!(
            TripSelector::from_name(Some("north")),
            TripSelector::Trip(TripName::new("north"))
        );
        assert_eq!(TripSelector::All.to_string(), "all");
    }

    #[test]
    fn only_started_segments_with_progress() {
        let segments = build_segments(&trips());
        let visits = build_visit_counts(&segments);

        let now = t(2) + Duration::minutes(30);
        let as_of = filter_as_of(&segments, &visits, now, &TripSelector::All);
        assert_eq!(as_of.now, Some(now));
        let progress: Vec<(&str, f64)> = as_of
            .segments
            .iter()
            .map(|s| (s.segment.trip.as_str(), s.progress))
            .collect();
        assert_eq!(progress, vec![("north", 0.75), ("south", 0.5)]);
        assert_eq!(as_of.in_progress().count(), 2);

        // Just as it starts, an instantaneous segment is already done
        let as_of = filter_as_of(&segments, &visits, t(4), &TripSelector::All);
        let stay = as_of.segments.iter().find(|s| s.segment.start_time == t(4)).unwrap();
        assert_eq!(stay.progress, 1.0);
        assert_eq!(stay.current_position(), stay.segment.to);
    }

    #[test]
    fn visits_appear_at_first_visit() {
        let segments = build_segments(&trips());
        let visits = build_visit_counts(&segments);
        // (10, 10) is first registered when north starts, at its own destination
        let as_of = filter_as_of(&segments, &visits, t(1), &TripSelector::All);
        assert_eq!(as_of.visits.len(), 1);
        assert_eq!(as_of.visits[0].key.as_str(), "10.000,10.000");

        // (20, 10) is only reached at 4
        let as_of = filter_as_of(&segments, &visits, t(3), &TripSelector::All);
        assert!(as_of.visits.iter().all(|v| v.key.as_str() != "20.000,10.000"));
        let as_of = filter_as_of(&segments, &visits, t(4), &TripSelector::All);
        assert!(as_of.visits.iter().any(|v| v.key.as_str() == "20.000,10.000"));
    }

    #[test]
    fn trip_selection() {
        let segments = build_segments(&trips());
        let visits = build_visit_counts(&segments);
        let south = TripSelector::Trip(TripName::new("south"));
        let as_of = filter_as_of(&segments, &visits, t(23), &south);
        assert_eq!(as_of.segments.len(), 2);
        assert!(as_of.segments.iter().all(|s| s.segment.trip.as_str() == "south"));
        // The shared point stays, north's own destination goes
        let keys: Vec<&str> = as_of.visits.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["10.000,10.000", "-5.000,10.000"]);

        let nobody = TripSelector::Trip(TripName::new("west"));
        let as_of = filter_as_of(&segments, &visits, t(23), &nobody);
        assert!(as_of.segments.is_empty());
        assert!(as_of.visits.is_empty());
    }
}
