use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Seconds since the clock started, summed from clamped `dt`s so that
    /// stalls do not jump animations forward.
    pub elapsed: f64,
    pub now: Instant,
    /// Counts ticks from zero. Used as the frame stamp for texture usage.
    pub frame_index: u64,
}

/// Produces one [`FrameTime`] per presented frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    min_dt: Duration,
    max_dt: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }
}

impl FrameClock {
    pub fn with_clamps(min_dt: Duration, max_dt: Duration) -> Self {
        Self::starting_at(Instant::now(), min_dt, max_dt)
    }

    fn starting_at(start: Instant, min_dt: Duration, max_dt: Duration) -> Self {
        debug_assert!(min_dt <= max_dt);
        Self { last: start, elapsed: 0.0, frame_index: 0, min_dt, max_dt }
    }

    /// Forgets the time spent suspended; the next `dt` is measured from now.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now.saturating_duration_since(self.last).clamp(self.min_dt, self.max_dt);
        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(start: Instant) -> FrameClock {
        FrameClock::starting_at(start, Duration::from_millis(1), Duration::from_millis(100))
    }

    #[test]
    fn frames_are_numbered_from_zero() {
        let t0 = Instant::now();
        let mut c = clock(t0);
        let a = c.tick_at(t0 + Duration::from_millis(16));
        let b = c.tick_at(t0 + Duration::from_millis(32));
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!((a.dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn long_stall_is_clamped() {
        let t0 = Instant::now();
        let mut c = clock(t0);
        let t = c.tick_at(t0 + Duration::from_secs(5));
        assert!((t.dt - 0.1).abs() < 1e-6);
        assert!((t.elapsed - 0.1).abs() < 1e-9);
    }

    #[test]
    fn repeated_instant_still_advances() {
        let t0 = Instant::now();
        let mut c = clock(t0);
        c.tick_at(t0);
        let t = c.tick_at(t0);
        assert!((t.dt - 0.001).abs() < 1e-6);
        assert!((t.elapsed - 0.002).abs() < 1e-9);
    }
}
