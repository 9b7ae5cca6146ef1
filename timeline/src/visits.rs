use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use geom::LonLat;
use serde::Serialize;

use itinerary::{HexColor, TripName};

use crate::{Segment, TripSelector};

/// Points that agree to this many decimal places (about 111m of latitude) count as the same place.
pub const VISIT_KEY_DECIMALS: usize = 3;

/// A quantized `"lat,lon"` string
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VisitKey(String);

impl VisitKey {
    /// None if either coordinate is NaN or infinite.
    pub fn quantize(pos: LonLat) -> Option<Self> {
        if !pos.x().is_finite() || !pos.y().is_finite() {
            return None;
        }
        Some(Self(format!(
            "{:.*},{:.*}",
            VISIT_KEY_DECIMALS,
            pos.y(),
            VISIT_KEY_DECIMALS,
            pos.x()
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every segment endpoint that landed on the same quantized point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisitRecord {
    pub key: VisitKey,
    /// The first point registered at this key, unquantized
    pub pos: LonLat,
    /// The first name registered at this key
    pub label: String,
    pub trips: BTreeSet<TripName>,
    /// From the earliest visit
    pub color: HexColor,
    /// At least 1
    pub visits: usize,
    pub first_visited: DateTime<Utc>,
    pub last_visited: DateTime<Utc>,
}

impl VisitRecord {
    pub fn visited_by(&self, trip: &TripName) -> bool {
        self.trips.contains(trip)
    }
}

/// One origin or destination of a segment
struct Registration<'a> {
    pos: LonLat,
    label: &'a str,
    trip: &'a TripName,
    color: &'a HexColor,
    time: DateTime<Utc>,
}

impl<'a> Registration<'a> {
    fn both_ends(segment: &'a Segment) -> [Self; 2] {
        [
            Self {
                pos: segment.from,
                label: &segment.from_label,
                trip: &segment.trip,
                color: &segment.color,
                time: segment.start_time,
            },
            Self {
                pos: segment.to,
                label: &segment.to_label,
                trip: &segment.trip,
                color: &segment.color,
                time: segment.end_time,
            },
        ]
    }
}

#[derive(Default)]
struct Accumulator {
    // Index into records, which stay in first-seen order
    index: BTreeMap<VisitKey, usize>,
    records: Vec<VisitRecord>,
}

impl Accumulator {
    fn register(mut self, reg: Registration) -> Self {
        let key = match VisitKey::quantize(reg.pos) {
            Some(key) => key,
            None => return self,
        };

        let idx = match self.index.get(&key).copied() {
            Some(idx) => idx,
            None => {
                self.index.insert(key.clone(), self.records.len());
                self.records.push(VisitRecord {
                    key,
                    pos: reg.pos,
                    label: reg.label.to_string(),
                    trips: BTreeSet::from([reg.trip.clone()]),
                    color: reg.color.clone(),
                    visits: 1,
                    first_visited: reg.time,
                    last_visited: reg.time,
                });
                return self;
            }
        };

        let record = &mut self.records[idx];
        let earlier = reg.time < record.first_visited;
        record.visits += 1;
        record.trips.insert(reg.trip.clone());
        if earlier {
            record.first_visited = reg.time;
        }
        if reg.time > record.last_visited {
            record.last_visited = reg.time;
        }
        // The earliest visit decides the color, but an empty color never wins
        if (earlier || record.color.is_empty()) && !reg.color.is_empty() {
            record.color = reg.color.clone();
        }
        self
    }
}

/// Collapses the origin and destination of every segment into one record per quantized point,
/// in the order the points were first seen. Callers wanting chronological order should sort by
/// `first_visited`.
pub fn build_visit_counts<'a, I: IntoIterator<Item = &'a Segment>>(
    segments: I,
) -> Vec<VisitRecord> {
    segments
        .into_iter()
        .flat_map(Registration::both_ends)
        .fold(Accumulator::default(), Accumulator::register)
        .records
}

/// Visits over every trip, plus visits for each trip counted in isolation.
pub struct VisitIndex {
    all: Vec<VisitRecord>,
    per_trip: BTreeMap<TripName, Vec<VisitRecord>>,
}

impl VisitIndex {
    pub fn new<'a, I: IntoIterator<Item = &'a TripName>>(trips: I, segments: &[Segment]) -> Self {
        let mut per_trip = BTreeMap::new();
        for trip in trips {
            per_trip.insert(
                trip.clone(),
                build_visit_counts(segments.iter().filter(|s| &s.trip == trip)),
            );
        }
        Self {
            all: build_visit_counts(segments),
            per_trip,
        }
    }

    pub fn all(&self) -> &[VisitRecord] {
        &self.all
    }

    /// An unknown trip gets every visit; filtering by trip membership will then drop them all.
    pub fn for_selector(&self, selector: &TripSelector) -> &[VisitRecord] {
        match selector {
            TripSelector::All => &self.all,
            TripSelector::Trip(name) => self
                .per_trip
                .get(name)
                .map(|list| list.as_slice())
                .unwrap_or(&self.all),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use itinerary::TransportKind;

    use super::*;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn segment(
        trip: &str,
        color: &str,
        from: (f64, f64),
        to: (f64, f64),
        start: DateTime<Utc>,
        hours: i64,
    ) -> Segment {
        Segment {
            trip: TripName::new(trip),
            color: HexColor::new(color),
            kind: TransportKind::Car,
            from_label: format!("{from:?}"),
            to_label: format!("{to:?}"),
            from: LonLat::new(from.1, from.0),
            to: LonLat::new(to.1, to.0),
            start_time: start,
            end_time: start + Duration::hours(hours),
            duration: Duration::hours(hours),
        }
    }

    #[test]
    fn quantized_keys() {
        let key = VisitKey::quantize(LonLat::new(-0.454295, 51.47002)).unwrap();
        assert_eq!(key.as_str(), "51.470,-0.454");
        let key = VisitKey::quantize(LonLat::new(20.0, 10.0)).unwrap();
        assert_eq!(key.as_str(), "10.000,20.000");
        assert!(VisitKey::quantize(LonLat::new(f64::NAN, 10.0)).is_none());
        assert!(VisitKey::quantize(LonLat::new(1.0, f64::INFINITY)).is_none());
    }

    #[test]
    fn merging() {
        let segments = vec![
            segment("a", "#aaaaaa", (1.0, 1.0), (2.0, 2.0), t(1, 0), 2),
            // Within a few meters of (2, 2)
            segment("b", "#bbbbbb", (2.0001, 2.0001), (3.0, 3.0), t(2, 0), 2),
            segment("a", "#aaaaaa", (3.0, 3.0), (1.0, 1.0), t(3, 0), 2),
        ];
        let visits = build_visit_counts(&segments);
        let keys: Vec<&str> = visits.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["1.000,1.000", "2.000,2.000", "3.000,3.000"]);

        let two = &visits[1];
        assert_eq!(two.visits, 2);
        assert_eq!(two.first_visited, t(1, 2));
        assert_eq!(two.last_visited, t(2, 0));
        assert_eq!(
            two.trips,
            BTreeSet::from([TripName::new("a"), TripName::new("b")])
        );
        // First registration wins the label and position
        assert_eq!(two.label, "(2.0, 2.0)");
        assert_eq!(two.pos, LonLat::new(2.0, 2.0));

        let one = &visits[0];
        assert_eq!(one.visits, 2);
        assert_eq!(one.first_visited, t(1, 0));
        assert_eq!(one.last_visited, t(3, 2));

        // Every endpoint is counted exactly once
        assert_eq!(visits.iter().map(|v| v.visits).sum::<usize>(), 6);
        for v in &visits {
            assert!(v.first_visited <= v.last_visited);
        }
    }

    #[test]
    fn earliest_visit_decides_color() {
        // Segments aren't necessarily sorted when they come in
        let segments = vec![
            segment("late", "#222222", (5.0, 5.0), (6.0, 6.0), t(9, 0), 1),
            segment("early", "#111111", (6.0, 6.0), (7.0, 7.0), t(1, 0), 1),
            segment("later", "#333333", (6.0, 6.0), (8.0, 8.0), t(20, 0), 1),
        ];
        let visits = build_visit_counts(&segments);
        let six = visits.iter().find(|v| v.key.as_str() == "6.000,6.000").unwrap();
        assert_eq!(six.visits, 3);
        assert_eq!(six.color, HexColor::new("#111111"));
        assert_eq!(six.first_visited, t(1, 0));
        assert_eq!(six.last_visited, t(20, 0));
    }

    #[test]
    fn empty_colors_never_win() {
        let segments = vec![
            segment("a", "", (5.0, 5.0), (5.0, 5.0), t(2, 0), 1),
            segment("b", "#bbbbbb", (5.0, 5.0), (5.0, 5.0), t(3, 0), 1),
            segment("c", "", (5.0, 5.0), (5.0, 5.0), t(1, 0), 1),
        ];
        let visits = build_visit_counts(&segments);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].visits, 6);
        assert_eq!(visits[0].color, HexColor::new("#bbbbbb"));
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let segments = vec![segment("a", "#aaaaaa", (f64::NAN, 1.0), (2.0, 2.0), t(1, 0), 1)];
        let visits = build_visit_counts(&segments);
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].visits, 1);
    }

    #[test]
    fn per_trip_index() {
        let segments = vec![
            segment("a", "#aaaaaa", (1.0, 1.0), (2.0, 2.0), t(1, 0), 2),
            segment("b", "#bbbbbb", (2.0, 2.0), (3.0, 3.0), t(2, 0), 2),
        ];
        let names = vec![TripName::new("a"), TripName::new("b")];
        let index = VisitIndex::new(&names, &segments);
        assert_eq!(index.all().len(), 3);

        let b = index.for_selector(&TripSelector::Trip(TripName::new("b")));
        assert_eq!(b.len(), 2);
        // Only b's own visit to (2, 2) counts here
        assert_eq!(b[0].visits, 1);
        assert_eq!(b[0].color, HexColor::new("#bbbbbb"));

        let unknown = index.for_selector(&TripSelector::Trip(TripName::new("z")));
        assert_eq!(unknown.len(), 3);
    }
}
