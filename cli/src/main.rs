#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod replay;

use std::time::Duration;

use abstutil::{prettyprint_usize, Timer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use structopt::StructOpt;

use itinerary::Catalog;
use timeline::{
    format_date, region_first_visits, AsOf, GeoJsonRegions, Playback, RegionKind, Segment,
    Selection, Timeline, TripSelector,
};

#[derive(StructOpt)]
struct Args {
    /// The path to a catalog of trips, either JSON or CSV
    #[structopt(long)]
    catalog: String,
    /// Only show this trip. By default, show all of them.
    #[structopt(long)]
    trip: Option<String>,
    /// Where to put the time slider, from 0 to 100
    #[structopt(long)]
    percent: Option<f64>,
    /// Replay the selection in real time, from wherever the slider is
    #[structopt(long)]
    play: bool,
    /// How many real seconds a full replay takes
    #[structopt(long, default_value = "16")]
    sweep_secs: f64,
    /// How many frames per second to print while replaying
    #[structopt(long, default_value = "30")]
    fps: u32,
    /// The path to a GeoJSON file with country boundaries
    #[structopt(long)]
    regions: Option<String>,
    /// The path to a GeoJSON file with state or province boundaries
    #[structopt(long)]
    states: Option<String>,
    /// Print what's visible as JSON instead of text
    #[structopt(long)]
    json: bool,
    /// Restore the trip and slider from this file, and save them there when done
    #[structopt(long)]
    savestate: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Savestate {
    trip: String,
    percent: f64,
}

impl Args {
    fn load(&self, timer: &mut Timer) -> Result<Timeline> {
        let file = fs_err::File::open(&self.catalog)?;
        let catalog = if self.catalog.ends_with(".csv") {
            Catalog::load_csv(file, timer)?
        } else {
            Catalog::load_json(file, timer)?
        };
        if catalog.trips.is_empty() {
            warn!("{} has no trips", self.catalog);
        }
        Ok(Timeline::new(catalog, timer))
    }

    fn sweep(&self) -> Result<Duration> {
        sweep_duration(self.sweep_secs)
    }
}

fn sweep_duration(secs: f64) -> Result<Duration> {
    if secs <= 0.0 {
        bail!("--sweep-secs must be positive, not {secs}");
    }
    Duration::try_from_secs_f64(secs).map_err(|err| anyhow!("--sweep-secs {secs}: {err}"))
}

fn main() -> Result<()> {
    abstutil::logger::setup();

    let args = Args::from_iter(abstutil::cli_args());
    let mut timer = Timer::new("load travel timeline");
    let timeline = args.load(&mut timer)?;

    let mut trip = args.trip.clone();
    let mut playback = Playback::new(args.sweep()?);
    if let Some(ref path) = args.savestate {
        if let Some(savestate) = read_savestate(path) {
            if trip.is_none() {
                trip = Some(savestate.trip);
            }
            playback.set_percent(savestate.percent);
        }
    }
    if let Some(percent) = args.percent {
        playback.set_percent(percent);
    }

    let selector = TripSelector::from_name(trip.as_deref());
    if let TripSelector::Trip(ref name) = selector {
        if timeline.catalog.trip(name).is_none() {
            let known: Vec<&str> = timeline.catalog.trip_names().map(|n| n.as_str()).collect();
            bail!("No trip named {name}; try one of {:?}", known);
        }
    }
    let selection = timeline.select(&selector);

    if !args.json {
        print_overview(&selection);
    }
    if args.play {
        if args.fps == 0 {
            bail!("--fps must be positive");
        }
        replay::run(&selection, &mut playback, args.fps, args.json)?;
    }

    let as_of = selection.as_of(playback.percent());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&as_of)?);
    } else {
        print_as_of(&as_of, playback.percent());
    }

    for (path, kind) in [
        (&args.regions, RegionKind::Countries),
        (&args.states, RegionKind::States),
    ] {
        if let Some(path) = path {
            let regions = GeoJsonRegions::load(fs_err::File::open(path)?, kind)?;
            if regions.is_empty() {
                warn!("{path} has no boundaries");
                continue;
            }
            print_regions(&as_of, &regions);
        }
    }

    if let Some(ref path) = args.savestate {
        let savestate = Savestate {
            trip: selector.to_string(),
            percent: playback.percent(),
        };
        fs_err::write(path, serde_json::to_string_pretty(&savestate)?)?;
        info!("Saved {path}");
    }

    Ok(())
}

// A missing or broken savestate just means starting fresh
fn read_savestate(path: &str) -> Option<Savestate> {
    let raw = match fs_err::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!("Not restoring savestate: {err}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(savestate) => Some(savestate),
        Err(err) => {
            warn!("Ignoring {path}: {err}");
            None
        }
    }
}

fn print_overview(selection: &Selection) {
    println!("{}", selection.hero_summary());
    for (kind, count) in selection.kind_counts().borrow() {
        println!("  {}: {}", kind.label(), prettyprint_usize(*count));
    }
    let km = total_km(selection.segments.iter().copied());
    println!("  Distance: {} km", prettyprint_usize(km.round() as usize));
}

fn total_km<'a, I: IntoIterator<Item = &'a Segment>>(segments: I) -> f64 {
    segments
        .into_iter()
        .map(|s| s.distance().inner_meters() / 1000.0)
        .sum()
}

fn print_as_of(as_of: &AsOf, percent: f64) {
    let now = match as_of.now {
        Some(now) => now,
        None => {
            println!("Nothing selected");
            return;
        }
    };
    println!();
    println!("As of {} ({:.1}%)", format_date(now), percent);
    println!(
        "{} segments started, {} stops reached",
        prettyprint_usize(as_of.segments.len()),
        prettyprint_usize(as_of.visits.len())
    );
    for timed in &as_of.segments {
        let headline = timed.segment.describe().replace('\n', " · ");
        if timed.is_complete() {
            println!("  - {headline}");
        } else {
            let pos = timed.current_position();
            println!(
                "  - {headline} ({:.0}% done, now near {:.3}, {:.3})",
                100.0 * timed.progress,
                pos.y(),
                pos.x()
            );
        }
    }
    for visit in &as_of.visits {
        println!("  * {}", visit.describe().replace('\n', " · "));
    }
}

fn print_regions(as_of: &AsOf, regions: &GeoJsonRegions) {
    let now = match as_of.now {
        Some(now) => now,
        None => return,
    };
    let visited = region_first_visits(as_of.visits.iter().copied(), regions);
    println!();
    println!(
        "{} of {} regions visited",
        prettyprint_usize(visited.len()),
        prettyprint_usize(regions.len())
    );
    for (name, visit) in visited {
        if let Some(fill) = visit.fill(now, 0.5) {
            println!("  {name}: {fill} since {}", format_date(visit.first_visited));
        }
    }
}
