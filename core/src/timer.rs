pub use web_time::Instant;

/// Source of the current time, injectable so rounds can be timed in tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock, backed by `performance.now()` on the web.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Elapsed time of a round.
///
/// Started on the first reveal and stopped when the round ends, after which
/// the reading stays frozen. `sample` is meant to be driven by a periodic
/// host tick (at least once per second) and reports when the displayed
/// second changes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Stopwatch {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    sampled_secs: u32,
}

impl Stopwatch {
    pub fn start(&mut self, now: Instant) {
        log::debug!("Stopwatch started");
        *self = Self {
            started_at: Some(now),
            stopped_at: None,
            sampled_secs: 0,
        };
    }

    /// Freezes the reading, no-op unless running.
    pub fn stop(&mut self, now: Instant) {
        if !self.is_running() {
            return;
        }
        self.stopped_at = Some(now);
        self.sampled_secs = self.elapsed_secs(now);
        log::debug!("Stopwatch stopped at {}s", self.sampled_secs);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    /// Whole seconds since start, up to the stop instant once stopped.
    pub fn elapsed_secs(&self, now: Instant) -> u32 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let end = self.stopped_at.unwrap_or(now);
        u32::try_from(end.saturating_duration_since(started_at).as_secs()).unwrap_or(u32::MAX)
    }

    /// Last value seen by [`Stopwatch::sample`] or [`Stopwatch::stop`].
    pub fn sampled_secs(&self) -> u32 {
        self.sampled_secs
    }

    /// Updates the sampled reading, returning it when the second changed.
    pub fn sample(&mut self, now: Instant) -> Option<u32> {
        if !self.is_running() {
            return None;
        }
        let secs = self.elapsed_secs(now);
        if secs == self.sampled_secs {
            return None;
        }
        self.sampled_secs = secs;
        Some(secs)
    }
}
