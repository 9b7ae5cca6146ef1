use chrono::{DateTime, Duration, Utc};
use geom::{Distance, LonLat};
use serde::{Serialize, Serializer};

use itinerary::{HexColor, PartialPoint, Trip, TransportKind, TripName};

/// A leg with both endpoints and both times resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub trip: TripName,
    pub color: HexColor,
    pub kind: TransportKind,
    pub from_label: String,
    pub to_label: String,
    pub from: LonLat,
    pub to: LonLat,
    pub start_time: DateTime<Utc>,
    /// Never before start_time
    pub end_time: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Resolves every leg of every trip, then orders everything by start time. Ties keep the order
/// of the input.
pub fn build_segments(trips: &[Trip]) -> Vec<Segment> {
    let mut segments = Vec::new();
    for trip in trips {
        // Where the previous leg of this trip ended
        let mut cursor: Option<LonLat> = None;
        for leg in &trip.itinerary {
            // Each missing coordinate of the origin comes from the previous leg, or for the first
            // leg, from its own destination. Anything still missing is NaN.
            let from = leg
                .from
                .or(PartialPoint::from(cursor))
                .or(leg.to)
                .or_nan();
            let to = leg.to.or(PartialPoint::from(from)).or_nan();

            let mut duration = duration_from_minutes(leg.duration_minutes);
            let end_time = match leg.start.checked_add_signed(duration) {
                Some(t) => t,
                None => {
                    warn!(
                        "{}: {} lasts {:?} minutes, past the end of time; treating it as instant",
                        trip.name, leg.from_label, leg.duration_minutes
                    );
                    duration = Duration::zero();
                    leg.start
                }
            };

            segments.push(Segment {
                trip: trip.name.clone(),
                color: trip.color.clone(),
                kind: leg.kind,
                from_label: leg.from_label.clone(),
                to_label: leg.to_label.clone(),
                from,
                to,
                start_time: leg.start,
                end_time,
                duration,
            });
            cursor = Some(to);
        }
    }
    // sort_by_key is stable
    segments.sort_by_key(|s| s.start_time);
    segments
}

// Negative, missing, and non-finite durations all become zero
fn duration_from_minutes(minutes: Option<f64>) -> Duration {
    let ms = minutes.unwrap_or(0.0) * 60_000.0;
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::zero();
    }
    // Anything this large overflows the end time anyway
    if ms >= i64::MAX as f64 {
        return Duration::milliseconds(i64::MAX);
    }
    Duration::milliseconds(ms.round() as i64)
}

impl Segment {
    pub fn is_instant(&self) -> bool {
        self.duration <= Duration::zero()
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    /// None if the segment hasn't started yet. Instantaneous segments are complete as soon as
    /// they start.
    pub fn progress_at(&self, now: DateTime<Utc>) -> Option<f64> {
        if !self.has_started(now) {
            return None;
        }
        if self.is_instant() {
            return Some(1.0);
        }
        let elapsed = (now - self.start_time).num_milliseconds() as f64;
        let total = self.duration.num_milliseconds() as f64;
        Some((elapsed / total).clamp(0.0, 1.0))
    }

    /// The point this fraction of the way along the great circle from origin to destination.
    pub fn position_at(&self, progress: f64) -> LonLat {
        if progress >= 1.0 {
            return self.to;
        }
        if progress <= 0.0 || progress.is_nan() {
            return self.from;
        }
        great_circle_lerp(self.from, self.to, progress)
    }

    /// Zero for stays and layovers, and when an endpoint is missing a coordinate
    pub fn distance(&self) -> Distance {
        let finite = |pt: LonLat| pt.x().is_finite() && pt.y().is_finite();
        if self.from == self.to || !finite(self.from) || !finite(self.to) {
            return Distance::ZERO;
        }
        self.from.gps_dist(self.to)
    }
}

// Spherical linear interpolation between two points, treating the earth as a sphere
fn great_circle_lerp(from: LonLat, to: LonLat, t: f64) -> LonLat {
    let (x0, y0) = (from.x().to_radians(), from.y().to_radians());
    let (x1, y1) = (to.x().to_radians(), to.y().to_radians());
    let (cy0, sy0) = (y0.cos(), y0.sin());
    let (cy1, sy1) = (y1.cos(), y1.sin());

    // Angular distance, via haversines
    let haversin = |x: f64| {
        let s = (x / 2.0).sin();
        s * s
    };
    let d = 2.0 * (haversin(y1 - y0) + cy0 * cy1 * haversin(x1 - x0)).sqrt().min(1.0).asin();
    let k = d.sin();
    if d < 1e-12 {
        return from;
    }
    if k.abs() < 1e-12 {
        // Antipodes; every great circle works, so don't pick one
        return LonLat::new(
            from.x() + (to.x() - from.x()) * t,
            from.y() + (to.y() - from.y()) * t,
        );
    }

    let a = (d - t * d).sin() / k;
    let b = (t * d).sin() / k;
    let x = a * cy0 * x0.cos() + b * cy1 * x1.cos();
    let y = a * cy0 * x0.sin() + b * cy1 * x1.sin();
    let z = a * sy0 + b * sy1;
    LonLat::new(
        y.atan2(x).to_degrees(),
        z.atan2((x * x + y * y).sqrt()).to_degrees(),
    )
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_milliseconds())
}
