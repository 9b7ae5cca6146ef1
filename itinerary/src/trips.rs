use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::legs::{self, Leg, TransportKind};
use crate::HexColor;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TripName(String);

impl TripName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Trip {
    pub name: TripName,
    pub color: HexColor,
    /// Only informational; nothing is derived from this
    pub countries: Vec<String>,
    pub itinerary: Vec<Leg>,
}

pub fn load_json<R: std::io::Read>(reader: R) -> Result<Vec<Trip>> {
    let records: Vec<Record> = serde_json::from_reader(reader)?;
    let mut trips = Vec::new();
    for rec in records {
        let mut itinerary = Vec::new();
        for leg in rec.itinerary {
            itinerary.push(leg.into_leg(&rec.trip_name)?);
        }
        trips.push(Trip {
            name: rec.trip_name,
            color: rec.color,
            countries: rec.countries,
            itinerary,
        });
    }
    Ok(trips)
}

pub fn load_csv<R: std::io::Read>(reader: R) -> Result<Vec<Trip>> {
    let mut trips: Vec<Trip> = Vec::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: CsvRecord = rec?;
        let leg = legs::Record {
            from: rec.from,
            to: rec.to,
            lat_from: rec.lat_from,
            lon_from: rec.lon_from,
            lat_to: rec.lat_to,
            lon_to: rec.lon_to,
            date: rec.date,
            duration: rec.duration,
            kind: rec.kind,
        }
        .into_leg(&rec.trip_name)?;

        // Rows for one trip don't have to be contiguous, but legs keep their row order
        match trips.iter_mut().find(|t| t.name == rec.trip_name) {
            Some(trip) => {
                if trip.color != rec.color {
                    bail!(
                        "{} is listed with colors {} and {}",
                        trip.name,
                        trip.color,
                        rec.color
                    );
                }
                trip.itinerary.push(leg);
            }
            None => trips.push(Trip {
                name: rec.trip_name,
                color: rec.color,
                countries: Vec::new(),
                itinerary: vec![leg],
            }),
        }
    }
    Ok(trips)
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "tripName")]
    trip_name: TripName,
    color: HexColor,
    #[serde(default)]
    countries: Vec<String>,
    itinerary: Vec<legs::Record>,
}

#[derive(Deserialize)]
struct CsvRecord {
    trip_name: TripName,
    color: HexColor,
    from: String,
    to: String,
    lat_from: Option<f64>,
    lon_from: Option<f64>,
    lat_to: Option<f64>,
    lon_to: Option<f64>,
    date: String,
    duration: Option<f64>,
    #[serde(rename = "type")]
    kind: TransportKind,
}
