#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod extent;
mod filter;
mod playback;
mod regions;
mod segment;
mod summary;
mod visits;

use abstutil::{prettyprint_usize, Timer};
use chrono::{DateTime, Utc};

use itinerary::Catalog;

pub use self::extent::{compute_time_extent, TimeExtent};
pub use self::filter::{filter_as_of, AsOf, TimedSegment, TripSelector, ALL_TRIPS};
pub use self::playback::{FrameTicker, Playback, PLAY_DURATION};
pub use self::regions::{
    normalize_country_name, region_first_visits, GeoJsonRegions, RegionKind, RegionLookup,
    RegionVisit,
};
pub use self::segment::{build_segments, Segment};
pub use self::summary::format_date;
pub use self::visits::{build_visit_counts, VisitIndex, VisitKey, VisitRecord, VISIT_KEY_DECIMALS};

/// Everything derived from a catalog. Built once; selections and as-of queries borrow from it.
pub struct Timeline {
    pub catalog: Catalog,
    /// Sorted by start time
    pub segments: Vec<Segment>,
    pub visits: VisitIndex,
}

/// The segments and visits of one trip (or all of them), and the time they span.
pub struct Selection<'a> {
    pub selector: TripSelector,
    pub segments: Vec<&'a Segment>,
    pub visits: &'a [VisitRecord],
    /// None if nothing is selected
    pub extent: Option<TimeExtent>,
}

impl Timeline {
    pub fn new(catalog: Catalog, timer: &mut Timer) -> Self {
        timer.start("build segments");
        let segments = build_segments(&catalog.trips);
        timer.stop("build segments");

        timer.start("count visits");
        let visits = VisitIndex::new(catalog.trip_names(), &segments);
        timer.stop("count visits");

        info!(
            "Timeline has {} segments and {} distinct stops",
            prettyprint_usize(segments.len()),
            prettyprint_usize(visits.all().len())
        );
        Self {
            catalog,
            segments,
            visits,
        }
    }

    pub fn select(&self, selector: &TripSelector) -> Selection {
        let segments: Vec<&Segment> = self
            .segments
            .iter()
            .filter(|s| selector.matches(&s.trip))
            .collect();
        let extent = compute_time_extent(segments.iter().copied());
        Selection {
            selector: selector.clone(),
            segments,
            visits: self.visits.for_selector(selector),
            extent,
        }
    }

    /// Shorthand for selecting, then filtering at a slider position.
    pub fn as_of(&self, selector: &TripSelector, percent: f64) -> AsOf {
        self.select(selector).as_of(percent)
    }
}

impl<'a> Selection<'a> {
    /// None if nothing is selected
    pub fn current_instant(&self, percent: f64) -> Option<DateTime<Utc>> {
        self.extent.map(|extent| extent.instant_at(percent))
    }

    /// Everything visible at a slider position. Empty if nothing is selected.
    pub fn as_of(&self, percent: f64) -> AsOf<'a> {
        match self.current_instant(percent) {
            Some(now) => filter_as_of(
                self.segments.iter().copied(),
                self.visits,
                now,
                &self.selector,
            ),
            None => AsOf::empty(),
        }
    }
}
