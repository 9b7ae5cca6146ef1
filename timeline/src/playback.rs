use std::time::{Duration, Instant};

use crate::TimeExtent;

/// How long, in real time, it takes to replay everything from 0 to 100%.
pub const PLAY_DURATION: Duration = Duration::from_secs(16);

/// The slider and the play/pause toggle.
#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    percent: f64,
    playing: bool,
    sweep: Duration,
}

impl Default for Playback {
    /// Start showing everything, paused
    fn default() -> Self {
        Self::new(PLAY_DURATION)
    }
}

impl Playback {
    pub fn new(sweep: Duration) -> Self {
        Self {
            percent: 100.0,
            playing: false,
            sweep,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.percent >= 100.0
    }

    pub fn sweep(&self) -> Duration {
        self.sweep
    }

    /// Scrubbing the slider. Doesn't change whether we're playing.
    pub fn set_percent(&mut self, percent: f64) {
        if percent.is_finite() {
            self.percent = percent.clamp(0.0, 100.0);
        }
    }

    /// Pauses if playing. Otherwise starts playing, rewinding first if we're already at the end.
    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
            return;
        }
        if self.is_finished() {
            self.percent = 0.0;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Moves forward by some amount of real time. Reaching the end stops playback. Returns true
    /// if the percent changed.
    pub fn advance(&mut self, real_dt: Duration) -> bool {
        if !self.playing {
            return false;
        }
        let before = self.percent;
        let sweep = self.sweep.as_secs_f64();
        let next = if sweep > 0.0 {
            before + 100.0 * real_dt.as_secs_f64() / sweep
        } else {
            100.0
        };
        if next >= 100.0 {
            self.percent = 100.0;
            self.playing = false;
        } else {
            self.percent = next;
        }
        self.percent != before
    }
}

/// Drives `Playback` from a stream of frame timestamps, like a display refresh callback would.
/// The first frame after (re)starting only records the time, so the time spent paused never
/// leaks into the next delta.
#[derive(Default)]
pub struct FrameTicker {
    last_tick: Option<Instant>,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self { last_tick: None }
    }

    /// Handles one frame. Returns false once there's nothing left to schedule: playback is
    /// paused or finished, or there's no time extent to play through. The ticker cancels itself
    /// in that case.
    pub fn tick(
        &mut self,
        now: Instant,
        playback: &mut Playback,
        extent: Option<&TimeExtent>,
    ) -> bool {
        if !playback.is_playing() || extent.is_none() {
            self.cancel();
            return false;
        }

        let dt = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        playback.advance(dt);

        if !playback.is_playing() {
            self.cancel();
            return false;
        }
        true
    }

    pub fn cancel(&mut self) {
        self.last_tick = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.last_tick.is_some()
    }
}
