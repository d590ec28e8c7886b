//! Frame timing for the fixed-rate update loop

use std::time::{Duration, Instant};

/// Tracks frame timing and paces a fixed-rate loop
pub struct FrameTimer {
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    /// Target duration of one frame (None = unpaced)
    interval: Option<Duration>,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            frame_count: 0,
            interval,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) -> u64 {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.frame_count += 1;
        self.frame_count
    }

    /// Time left in the current frame before the next tick is due
    pub fn remaining(&self) -> Duration {
        match self.interval {
            Some(interval) => interval.saturating_sub(self.last_frame.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the next tick is due
    pub fn wait_next(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Get delta time as Duration
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(None)
    }
}
