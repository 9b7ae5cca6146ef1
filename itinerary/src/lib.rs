#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod color;
mod legs;
mod trips;

use std::collections::BTreeSet;

use abstutil::Timer;
use anyhow::Result;

pub use color::HexColor;
pub use legs::{Leg, PartialPoint, TransportKind};
pub use trips::{Trip, TripName};

/// Every trip to show, in the order they were authored. Nothing downstream mutates this.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub trips: Vec<Trip>,
}

impl Catalog {
    /// Trip names must be unique; everything downstream groups by them.
    pub fn new(trips: Vec<Trip>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for trip in &trips {
            if !seen.insert(&trip.name) {
                bail!("Duplicate {:?}", trip.name);
            }
        }
        Ok(Self { trips })
    }

    pub fn empty() -> Self {
        Self { trips: Vec::new() }
    }

    /// Reads a JSON array of trips, each with a nested itinerary.
    pub fn load_json<R: std::io::Read>(reader: R, timer: &mut Timer) -> Result<Self> {
        timer.start("parse catalog JSON");
        let result = trips::load_json(reader);
        timer.stop("parse catalog JSON");
        let catalog = Self::new(result?)?;
        catalog.log_stats();
        Ok(catalog)
    }

    /// Reads a flat CSV file with one row per leg. Rows are grouped into trips by name, keeping
    /// the order of first appearance.
    pub fn load_csv<R: std::io::Read>(reader: R, timer: &mut Timer) -> Result<Self> {
        timer.start("parse catalog CSV");
        let result = trips::load_csv(reader);
        timer.stop("parse catalog CSV");
        let catalog = Self::new(result?)?;
        catalog.log_stats();
        Ok(catalog)
    }

    pub fn trip(&self, name: &TripName) -> Option<&Trip> {
        self.trips.iter().find(|t| &t.name == name)
    }

    pub fn trip_names(&self) -> impl Iterator<Item = &TripName> {
        self.trips.iter().map(|t| &t.name)
    }

    pub fn num_legs(&self) -> usize {
        self.trips.iter().map(|t| t.itinerary.len()).sum()
    }

    fn log_stats(&self) {
        info!(
            "Catalog has {} trips with {} legs",
            abstutil::prettyprint_usize(self.trips.len()),
            abstutil::prettyprint_usize(self.num_legs())
        );
    }
}
