use std::time::Instant;

/// Longest step handed to the engines; a stalled terminal should not fast-forward the
/// simulation by seconds.
pub const MAX_DT: f32 = 0.1;

/// Simulation time for one frame. Engines only ever see this value, never the wall clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    pub frame: u64,
    pub dt: f32,
    pub t: f32,
}

impl FrameTime {
    /// Deterministic time for frame `frame` at a fixed step.
    pub fn fixed(frame: u64, dt: f32) -> Self {
        Self {
            frame,
            dt,
            t: frame as f32 * dt,
        }
    }
}

pub struct SimulationClock {
    last: Option<Instant>,
    elapsed: f32,
    frame: u64,
    paused: bool,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self {
            last: None,
            elapsed: 0.0,
            frame: 0,
            paused: false,
        }
    }

    /// Advances to `now`. While paused, `dt` is zero and elapsed time stands still.
    pub fn tick(&mut self, now: Instant) -> FrameTime {
        let raw = match self.last {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);

        let dt = if self.paused { 0.0 } else { raw.clamp(0.0, MAX_DT) };
        self.elapsed += dt;
        if !self.paused {
            self.frame += 1;
        }

        FrameTime {
            frame: self.frame,
            dt,
            t: self.elapsed,
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts the Lenia update stride to the measured frame cost.
pub struct FrameBudget {
    adaptive: bool,
    ema_ms: f32,
    stride: u32,
    max_stride: u32,
}

impl FrameBudget {
    pub fn new(adaptive: bool, max_stride: u32) -> Self {
        Self {
            adaptive,
            ema_ms: 0.0,
            stride: 1,
            max_stride: max_stride.max(1),
        }
    }

    pub fn update(&mut self, frame_ms: f32, target_ms: f32) {
        if !self.adaptive {
            return;
        }
        self.ema_ms = if self.ema_ms == 0.0 {
            frame_ms
        } else {
            self.ema_ms * 0.95 + frame_ms * 0.05
        };

        if self.ema_ms > target_ms * 1.22 {
            self.stride = (self.stride + 1).min(self.max_stride);
            // Let the average settle before stepping again.
            self.ema_ms = target_ms;
        } else if self.ema_ms < target_ms * 0.72 && self.stride > 1 {
            self.stride -= 1;
            self.ema_ms = target_ms;
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn ema_ms(&self) -> f32 {
        self.ema_ms
    }
}
