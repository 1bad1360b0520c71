//! Time-bucketed counters with a fixed resolution and window length
//!
//! Every counter of a [`Site`](super::site::Site) shares one origin instant, so
//! bucket `i` always covers `[origin + i * resolution, origin + (i + 1) * resolution)`.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterError {
    ZeroResolution,
    WindowShorterThanResolution { window: Duration, resolution: Duration },
    ZeroDuration,
}

impl std::fmt::Display for CounterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterError::ZeroResolution => write!(f, "counter resolution must be non-zero"),
            CounterError::WindowShorterThanResolution { window, resolution } => write!(
                f,
                "counter window {:?} is shorter than its resolution {:?}",
                window, resolution
            ),
            CounterError::ZeroDuration => write!(f, "requested duration must be non-zero"),
        }
    }
}

impl std::error::Error for CounterError {}

/// Validated resolution/window pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterShape {
    resolution: Duration,
    window: Duration,
}

impl CounterShape {
    pub fn new(resolution: Duration, window: Duration) -> Result<Self, CounterError> {
        if resolution.is_zero() {
            return Err(CounterError::ZeroResolution);
        }
        if window < resolution {
            return Err(CounterError::WindowShorterThanResolution { window, resolution });
        }
        Ok(Self { resolution, window })
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of buckets needed to cover `d`, rounding up
    fn buckets_for(&self, d: Duration) -> u64 {
        let res = self.resolution.as_nanos();
        ((d.as_nanos() + res - 1) / res) as u64
    }

    fn window_buckets(&self) -> u64 {
        self.buckets_for(self.window)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    index: u64,
    count: u64,
}

/// Sliding counter split into `window / resolution` buckets
///
/// One writer calls [`add`](Self::add); any number of readers call
/// [`total`](Self::total) and [`average`](Self::average). The bucket list sits
/// behind a mutex so a reader never observes a half-applied add.
#[derive(Debug)]
pub struct WindowedCounter {
    shape: CounterShape,
    origin: Instant,
    buckets: Mutex<VecDeque<Bucket>>,
}

impl WindowedCounter {
    pub fn new(shape: CounterShape, origin: Instant) -> Self {
        Self {
            shape,
            origin,
            buckets: Mutex::new(VecDeque::with_capacity(shape.window_buckets() as usize)),
        }
    }

    pub fn shape(&self) -> CounterShape {
        self.shape
    }

    fn bucket_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        (elapsed.as_nanos() / self.shape.resolution.as_nanos()) as u64
    }

    pub fn add(&self, n: u64) {
        self.add_at(n, Instant::now());
    }

    /// Record `n` hits in the bucket containing `now`
    pub fn add_at(&self, n: u64, now: Instant) {
        let index = self.bucket_index(now);
        let window_buckets = self.shape.window_buckets();
        let mut buckets = self.buckets.lock();

        while let Some(front) = buckets.front() {
            if front.index + window_buckets <= index {
                buckets.pop_front();
            } else {
                break;
            }
        }

        match buckets.back().map(|b| b.index) {
            Some(last) if last < index => buckets.push_back(Bucket { index, count: n }),
            None => buckets.push_back(Bucket { index, count: n }),
            // Same or older bucket; older only happens for late adds.
            Some(_) => match buckets.binary_search_by_key(&index, |b| b.index) {
                Ok(pos) => buckets[pos].count += n,
                Err(pos) => buckets.insert(pos, Bucket { index, count: n }),
            },
        }
    }

    pub fn total(&self, d: Duration) -> Result<u64, CounterError> {
        self.total_at(d, Instant::now())
    }

    /// Sum of the most recent `ceil(d / resolution)` buckets, current one included.
    ///
    /// `d` longer than the configured window is clamped to the window.
    pub fn total_at(&self, d: Duration, now: Instant) -> Result<u64, CounterError> {
        if d.is_zero() {
            return Err(CounterError::ZeroDuration);
        }
        let span = self.shape.buckets_for(d.min(self.shape.window));
        let current = self.bucket_index(now);

        let buckets = self.buckets.lock();
        Ok(buckets
            .iter()
            .rev()
            .skip_while(|b| b.index > current)
            .take_while(|b| b.index + span > current)
            .map(|b| b.count)
            .sum())
    }

    pub fn average(&self, d: Duration) -> Result<f64, CounterError> {
        self.average_at(d, Instant::now())
    }

    /// `total(d) / d` in hits per second.
    ///
    /// Always divides by the full `d`, even before `d` has elapsed since the
    /// origin, so the rate reads low during warm-up.
    pub fn average_at(&self, d: Duration, now: Instant) -> Result<f64, CounterError> {
        let total = self.total_at(d, now)?;
        Ok(total as f64 / d.as_secs_f64())
    }

    /// Number of buckets currently retained
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}
