//! Performance measurement tools.

use std::{
    fmt, mem,
    sync::Mutex,
    time::{Duration, Instant},
};

const EMA_ALPHA: f32 = 0.3;

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are averaged with an exponential moving average and reset when the timer is
/// displayed using `{}` ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// The current average time in seconds, `None` until the first measurement.
    avg: Option<f32>,
    /// The number of time measurements that contributed to the current `avg`.
    count: usize,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        self.measure(timee).0
    }

    /// Invokes a closure and returns its result together with the time it took.
    ///
    /// The time is also recorded in the timer's average.
    pub fn measure<T>(&self, timee: impl FnOnce() -> T) -> (T, Duration) {
        let start = Instant::now();
        let value = timee();
        let elapsed = start.elapsed();
        self.record(elapsed);
        (value, elapsed)
    }

    fn record(&self, duration: Duration) {
        let secs = duration.as_secs_f32();
        let mut state = self.state.lock().unwrap();
        state.avg = Some(match state.avg {
            Some(avg) => avg + EMA_ALPHA * (secs - avg),
            None => secs,
        });
        state.count += 1;
    }

    /// Returns the average recorded time without resetting it.
    pub fn average(&self) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .avg
            .map(Duration::from_secs_f32)
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = mem::take(&mut *self.state.lock().unwrap());
        let avg_ms = state.avg.unwrap_or(0.0) * 1000.0;

        write!(f, "{}: {}x{avg_ms:.01}ms", self.name, state.count)
    }
}

/// Logs frames per second.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            log::debug!("{}: {} FPS", self.name, self.frames);

            self.frames = 0;
            self.start = Instant::now();
        }
    }
}
