use anyhow::Result;
use chrono::{DateTime, Utc};
use geom::LonLat;
use serde::{Deserialize, Serialize};

use crate::TripName;

/// One raw itinerary entry, as authored. Coordinates may be missing; resolving them against the
/// previous leg happens later.
#[derive(Clone, Debug, PartialEq)]
pub struct Leg {
    pub from_label: String,
    pub to_label: String,
    /// Missing coordinates are taken from wherever the previous leg of the trip ended.
    pub from: PartialPoint,
    pub to: PartialPoint,
    pub start: DateTime<Utc>,
    pub duration_minutes: Option<f64>,
    pub kind: TransportKind,
}

/// A point where either coordinate may be missing. Each axis is filled in independently.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartialPoint {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

impl PartialPoint {
    pub fn new(lon: Option<f64>, lat: Option<f64>) -> Self {
        Self { lon, lat }
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_none() && self.lat.is_none()
    }

    /// None unless both coordinates are known
    pub fn complete(self) -> Option<LonLat> {
        Some(LonLat::new(self.lon?, self.lat?))
    }

    /// Fills in each missing coordinate from `other`.
    pub fn or(self, other: Self) -> Self {
        Self {
            lon: self.lon.or(other.lon),
            lat: self.lat.or(other.lat),
        }
    }

    /// Coordinates still missing become NaN.
    pub fn or_nan(self) -> LonLat {
        LonLat::new(
            self.lon.unwrap_or(f64::NAN),
            self.lat.unwrap_or(f64::NAN),
        )
    }
}

impl From<LonLat> for PartialPoint {
    /// NaN coordinates count as missing
    fn from(pt: LonLat) -> Self {
        Self::new(
            Some(pt.x()).filter(|x| x.is_finite()),
            Some(pt.y()).filter(|y| y.is_finite()),
        )
    }
}

impl From<Option<LonLat>> for PartialPoint {
    fn from(pt: Option<LonLat>) -> Self {
        pt.map(Self::from).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Flight,
    Cruise,
    Train,
    Car,
    Layover,
    Stay,
}

impl TransportKind {
    pub fn label(self) -> &'static str {
        match self {
            TransportKind::Flight => "Flight",
            TransportKind::Cruise => "Cruise",
            TransportKind::Train => "Train",
            TransportKind::Car => "Car",
            TransportKind::Layover => "Layover",
            TransportKind::Stay => "Stay",
        }
    }

    /// Unzoomed stroke width for drawing a route of this kind
    pub fn route_width(self) -> f64 {
        match self {
            TransportKind::Train => 3.5,
            TransportKind::Car => 2.8,
            _ => 2.5,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct Record {
    #[serde(rename = "airportFrom")]
    pub from: String,
    #[serde(rename = "airportTo")]
    pub to: String,
    #[serde(rename = "latFrom")]
    pub lat_from: Option<f64>,
    #[serde(rename = "lonFrom")]
    pub lon_from: Option<f64>,
    #[serde(rename = "latTo")]
    pub lat_to: Option<f64>,
    #[serde(rename = "lonTo")]
    pub lon_to: Option<f64>,
    pub date: String,
    pub duration: Option<f64>,
    #[serde(rename = "type")]
    pub kind: TransportKind,
}

impl Record {
    pub fn into_leg(self, trip: &TripName) -> Result<Leg> {
        let start = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|err| anyhow!("{trip}: leg {} has date {}: {err}", self.from, self.date))?
            .with_timezone(&Utc);
        let from = PartialPoint::new(self.lon_from, self.lat_from);
        let to = PartialPoint::new(self.lon_to, self.lat_to);
        for (label, pt) in [(&self.from, from), (&self.to, to)] {
            if !pt.is_empty() && pt.complete().is_none() {
                debug!("{trip}: {label} only has one of latitude and longitude");
            }
        }
        Ok(Leg {
            from_label: self.from,
            to_label: self.to,
            from,
            to,
            start,
            duration_minutes: self.duration,
            kind: self.kind,
        })
    }
}
