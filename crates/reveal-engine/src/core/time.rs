use std::collections::VecDeque;

/// Fixed-interval tick source driven by variable frame deltas.
/// Discrete effects (decode, typewriter) step once per interval.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    /// Milliseconds between ticks.
    interval: f32,
    /// Accumulated time from frame deltas.
    accumulator: f32,
    /// Most ticks released by a single frame.
    max_catch_up: u32,
}

impl IntervalTimer {
    pub fn new(interval_ms: f32) -> Self {
        Self {
            interval: interval_ms,
            accumulator: 0.0,
            max_catch_up: 10,
        }
    }

    pub fn with_max_catch_up(mut self, max_ticks: u32) -> Self {
        self.max_catch_up = max_ticks.max(1);
        self
    }

    /// Add frame time to the accumulator. Returns the number of ticks due.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        // Cap at max_catch_up ticks per frame
        self.accumulator = self.accumulator.min(self.interval * self.max_catch_up as f32);
        let ticks = (self.accumulator / self.interval) as u32;
        self.accumulator -= ticks as f32 * self.interval;
        ticks
    }

}

/// Injectable per-frame clock.
///
/// The browser bridge feeds real frame deltas; tests feed a fixed script.
pub trait FrameSource {
    /// Milliseconds since the previous frame, or `None` once the source stops.
    fn next_frame(&mut self) -> Option<f32>;
}

/// Scripted frame deltas for deterministic runs.
#[derive(Debug, Clone, Default)]
pub struct ManualFrames {
    frames: VecDeque<f32>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` frames of `dt_ms` each.
    pub fn uniform(dt_ms: f32, count: usize) -> Self {
        Self {
            frames: std::iter::repeat(dt_ms).take(count).collect(),
        }
    }

    pub fn push(&mut self, dt_ms: f32) {
        self.frames.push_back(dt_ms);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ManualFrames {
    fn next_frame(&mut self) -> Option<f32> {
        self.frames.pop_front()
    }
}
