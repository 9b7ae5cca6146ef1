use std::time::{Duration, Instant};

use anyhow::Result;

use timeline::{format_date, FrameTicker, Playback, Selection};

/// Plays through the selection in real time, printing a line per frame. Returns once playback
/// reaches the end.
pub fn run(selection: &Selection, playback: &mut Playback, fps: u32, quiet: bool) -> Result<()> {
    if selection.extent.is_none() {
        warn!("Nothing selected, so there's nothing to play");
        return Ok(());
    }

    let frame = Duration::from_secs(1) / fps;
    let mut ticker = FrameTicker::new();
    playback.toggle();
    info!(
        "Playing {} from {:.1}% over {:?}",
        selection.selector,
        playback.percent(),
        playback.sweep()
    );

    let start = Instant::now();
    let mut frames = 0;
    while ticker.tick(Instant::now(), playback, selection.extent.as_ref()) {
        frames += 1;
        if !quiet {
            print_frame(selection, playback.percent());
        }
        std::thread::sleep(frame);
    }
    if !quiet {
        print_frame(selection, playback.percent());
    }
    debug!("Replayed {} frames in {:?}", frames, start.elapsed());

    if playback.is_playing() {
        bail!("Playback stopped early at {:.1}%", playback.percent());
    }
    Ok(())
}

fn print_frame(selection: &Selection, percent: f64) {
    let as_of = selection.as_of(percent);
    let now = match as_of.now {
        Some(now) => now,
        None => return,
    };
    println!(
        "{} · {:5.1}% · {} in progress · {} stops",
        format_date(now),
        percent,
        as_of.in_progress().count(),
        as_of.visits.len()
    );
}
